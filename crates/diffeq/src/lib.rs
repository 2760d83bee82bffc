//! diffeq - compile, load and solve ODE models in a sandbox
//!
//! Model source text is compiled by a remote service into a WASM module
//! exporting vector, options and solver operations. [`Diffeq`] sends the
//! source, instantiates the returned binary in an isolated sandbox, and keeps
//! the result in a registry keyed by an optional model id.
//!
//! # Example
//!
//! ```
//! use diffeq::prelude::*;
//! use diffeq_test::{FixtureCompileService, LOGISTIC_SOURCE};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let diffeq = Diffeq::with_service(HostConfig::default(), FixtureCompileService::new());
//! let model = diffeq.compile(LOGISTIC_SOURCE, None).await.unwrap();
//!
//! let y = model
//!     .scoped(|s| {
//!         let options = Options::create(s, diffeq.default_options())?;
//!         let solver = Solver::new(s, &options)?;
//!         let times = Vector::from_slice(s, &[0.0, 2.0])?;
//!         let inputs = Vector::from_slice(s, &[1.0, 2.0])?;
//!         let mut outputs = Vector::empty(s)?;
//!         solver.solve(s, &times, &inputs, &mut outputs)?;
//!         outputs.get(s, 2)
//!     })
//!     .unwrap();
//! assert!((y - 1.7616).abs() < 1e-2);
//! # });
//! ```

pub mod compile;
pub mod context;
pub mod registry;

#[cfg(feature = "console")]
pub mod console;

pub use compile::HttpCompileService;
pub use context::Diffeq;
pub use registry::ModelRegistry;

pub use diffeq_config::{CompilerConfig, ConfigError, HostConfig, SandboxConfig};
pub use diffeq_core::{
    CompileService, DiffeqError, Jacobian, LinearSolver, OptionsConfig, Preconditioner, Result,
};
pub use diffeq_runtime::{
    CapabilityReport, HandleError, ModelInstance, Options, Session, Solver, SolverCounts,
    UninitSolver, Vector,
};

pub mod prelude {
    pub use super::{
        CompileService, Diffeq, DiffeqError, HostConfig, ModelInstance, Options, OptionsConfig,
        Result, Session, Solver, UninitSolver, Vector,
    };
}
