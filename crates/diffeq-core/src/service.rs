//! The seam between the orchestrator and whatever turns model source into a binary.

use std::future::Future;

use crate::error::Result;

/// Turns model source text into a compiled module binary.
///
/// Implementations resolve only once the complete response is available.
/// A rejection of the source is reported as [`DiffeqError::Compilation`]
/// carrying the service's diagnostic text.
///
/// [`DiffeqError::Compilation`]: crate::DiffeqError::Compilation
pub trait CompileService {
    fn compile(&self, source: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}
