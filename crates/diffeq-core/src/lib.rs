//! diffeq core - shared types for hosting compiled ODE solver modules
//!
//! This crate provides the vocabulary used by every other diffeq crate:
//! - The error taxonomy for compilation, loading, handles and solving
//! - The solver options record and its enumerations
//! - The compile-service seam used by the orchestrator

pub mod error;
pub mod options;
pub mod service;

#[cfg(test)]
mod options_tests;

pub use error::{DiffeqError, Result};
pub use options::{Jacobian, LinearSolver, OptionsConfig, Preconditioner};
pub use service::CompileService;
