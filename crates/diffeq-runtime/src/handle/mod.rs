//! Typed owners of module-side objects.
//!
//! A handle wraps the integer the module returned from a create operation,
//! together with the operation group it was built from and the instance it
//! belongs to. Handles are neither `Copy` nor `Clone`; `destroy` consumes
//! them. Every operation verifies the handle against the session first, so
//! using a handle on a different instance, or after the module object was
//! released by a scope, is an error rather than a memory hazard.
//!
//! Consuming operations verify before taking ownership. When the session
//! rejects the handle, the [`HandleError`] carries it back to the caller so
//! it can be retried with the session it belongs to.

mod options;
mod solver;
mod vector;


pub use options::Options;
pub use solver::{Solver, SolverCounts, UninitSolver};
pub use vector::Vector;

use std::fmt;

use diffeq_core::{DiffeqError, Result};

/// Error from an operation that consumes a handle.
///
/// `handle` is `Some` when the session rejected the handle before the module
/// ran, and `None` once the module object has been released.
#[derive(Debug)]
pub struct HandleError<H> {
    error: DiffeqError,
    handle: Option<H>,
}

impl<H> HandleError<H> {
    pub(crate) fn rejected(error: DiffeqError, handle: H) -> Self {
        Self {
            error,
            handle: Some(handle),
        }
    }

    pub(crate) fn consumed(error: DiffeqError) -> Self {
        Self {
            error,
            handle: None,
        }
    }

    pub fn error(&self) -> &DiffeqError {
        &self.error
    }

    /// Takes back the handle if the operation never reached the module.
    pub fn into_handle(self) -> Option<H> {
        self.handle
    }

    pub fn into_parts(self) -> (DiffeqError, Option<H>) {
        (self.error, self.handle)
    }
}

impl<H> fmt::Display for HandleError<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl<H: fmt::Debug> std::error::Error for HandleError<H> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

impl<H> From<HandleError<H>> for DiffeqError {
    fn from(err: HandleError<H>) -> Self {
        err.error
    }
}

/// Converts a host length or index into the module's 32-bit unsigned form.
fn to_module(value: usize, what: &str) -> Result<i32> {
    u32::try_from(value)
        .map(|v| v as i32)
        .map_err(|_| DiffeqError::Precondition(format!("{what} {value} exceeds the module's 32-bit range")))
}

/// Reads a length or address returned by the module as unsigned.
fn from_module(value: i32) -> usize {
    value as u32 as usize
}

/// Reads a count the module reports about itself; negative values are invalid.
fn reported_count(option: &'static str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| DiffeqError::InvalidOptionValue {
        option,
        value: i64::from(value),
    })
}
