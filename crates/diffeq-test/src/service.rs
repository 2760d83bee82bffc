//! In-process compile service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use diffeq_core::{CompileService, DiffeqError, Result};

use crate::logistic::{logistic_module, Variant};

/// Logistic growth with a self-limiting second state.
pub const LOGISTIC_SOURCE: &str = r#"
in = [r, k]
r { 1 }
k { 1 }
u_i {
    y = 1,
    z = 0,
}
dudt_i {
    dydt = 0,
    dzdt = 0,
}
F_i {
    dydt,
    0,
}
G_i {
    (r * y) * (1 - (y / k)),
    (2 * y) - z,
}
out_i {
    y,
    z,
}"#;

/// Logistic growth with a cross term in the second state.
pub const CROSS_TERM_SOURCE: &str = r#"
in = [r, k]
r { 1 }
k { 1 }
u_i {
    y = 1,
    z = 0,
}
dudt_i {
    dydt = 0,
    dzdt = 0,
}
F_i {
    dydt,
    0,
}
G_i {
    (r * y) * (1 - (y / k)),
    (y * z) - (k * z),
}
out_i {
    y,
    z,
}"#;

/// Compile service that maps known model sources to fixture binaries.
///
/// Unknown sources are rejected with a parse diagnostic, like the remote
/// service does for invalid models.
#[derive(Debug, Clone)]
pub struct FixtureCompileService {
    binaries: HashMap<String, Vec<u8>>,
    requests: std::sync::Arc<AtomicUsize>,
}

impl FixtureCompileService {
    /// Creates a service that knows [`LOGISTIC_SOURCE`] and [`CROSS_TERM_SOURCE`].
    pub fn new() -> Self {
        Self::empty()
            .with_binary(LOGISTIC_SOURCE, logistic_module(Variant::SelfLimiting))
            .with_binary(CROSS_TERM_SOURCE, logistic_module(Variant::CrossTerm))
    }

    /// Creates a service that rejects every source.
    pub fn empty() -> Self {
        Self {
            binaries: HashMap::new(),
            requests: std::sync::Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answers `source` with `binary`, valid or not.
    pub fn with_binary(mut self, source: impl Into<String>, binary: Vec<u8>) -> Self {
        self.binaries.insert(source.into(), binary);
        self
    }

    /// Number of compile requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Default for FixtureCompileService {
    fn default() -> Self {
        Self::new()
    }
}

impl CompileService for FixtureCompileService {
    async fn compile(&self, source: &str) -> Result<Vec<u8>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.binaries.get(source) {
            Some(binary) => Ok(binary.clone()),
            None => {
                let first_line = source.trim().lines().next().unwrap_or("");
                Err(DiffeqError::Compilation(format!(
                    "error: could not parse model at line 1: `{first_line}`"
                )))
            }
        }
    }
}
