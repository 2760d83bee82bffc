//! Error types for diffeq

use thiserror::Error;

/// Main error type for diffeq operations
#[derive(Debug, Error)]
pub enum DiffeqError {
    /// The compile service rejected the model source
    #[error("Compilation failed: {0}")]
    Compilation(String),

    /// The compile service could not be reached or its response was unreadable
    #[error("Transport error: {0}")]
    Transport(String),

    /// The compiled binary failed to parse, link or instantiate
    #[error("Module load error: {0}")]
    ModuleLoad(String),

    /// The module does not export an operation (or exports it with the wrong signature)
    #[error("Missing capability: {name}")]
    MissingCapability { name: &'static str },

    /// A host-side precondition failed; the module was not invoked
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The solve entry point returned a non-zero code
    #[error("Solve failed with code {code}: {detail}")]
    SolveFailure { code: i32, detail: String },

    /// The module trapped while executing an operation
    #[error("Module trapped in {operation}: {message}")]
    Trap {
        operation: &'static str,
        message: String,
    },

    /// The module reported a value outside the range of an option
    #[error("Invalid value {value} for option {option}")]
    InvalidOptionValue { option: &'static str, value: i64 },

    /// A region of linear memory could not be viewed as f64 values
    #[error("Memory view error: {0}")]
    MemoryView(String),

    /// A handle was used after it had been released
    #[error("{kind} handle {ptr:#x} was used after destroy")]
    UseAfterDestroy { kind: &'static str, ptr: i32 },

    /// A handle was used with a model instance other than the one that created it
    #[error("Handle belongs to model instance {found}, but session is bound to {expected}")]
    CrossInstanceHandle { expected: u64, found: u64 },

    /// No model is registered under the requested id
    #[error("Model {0} not found, compile the model first")]
    ModelNotFound(String),

    /// Invalid host configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for diffeq operations
pub type Result<T> = std::result::Result<T, DiffeqError>;
