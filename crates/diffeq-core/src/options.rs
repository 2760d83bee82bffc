//! Solver options record.
//!
//! [`OptionsConfig`] is the host-side description of an options block. It is
//! pushed into a module's option object field by field and can be read back
//! from the module to verify what the module actually stored.
//!
//! The enumerations carry the numeric codes understood by compiled modules.

use serde::{Deserialize, Serialize};

use crate::error::{DiffeqError, Result};

/// Linear solver used inside the implicit integrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearSolver {
    #[default]
    Dense,
    Klu,
    Spbcgs,
    Spfgmr,
    Spgmr,
    Sptfqmr,
}

/// Preconditioning side for the iterative linear solvers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Preconditioner {
    #[default]
    None,
    Left,
    Right,
    Both,
}

/// How the Jacobian is formed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Jacobian {
    #[default]
    Dense,
    Sparse,
    Numerical,
}

macro_rules! module_codes {
    ($ty:ident, $option:literal, { $($variant:ident = $code:literal),+ $(,)? }) => {
        impl $ty {
            /// Returns the code a compiled module uses for this value.
            pub fn code(self) -> i32 {
                match self {
                    $($ty::$variant => $code,)+
                }
            }
        }

        impl TryFrom<i32> for $ty {
            type Error = DiffeqError;

            fn try_from(code: i32) -> Result<Self> {
                match code {
                    $($code => Ok($ty::$variant),)+
                    other => Err(DiffeqError::InvalidOptionValue {
                        option: $option,
                        value: i64::from(other),
                    }),
                }
            }
        }
    };
}

module_codes!(LinearSolver, "linear_solver", {
    Dense = 0,
    Klu = 1,
    Spbcgs = 2,
    Spfgmr = 3,
    Spgmr = 4,
    Sptfqmr = 5,
});

module_codes!(Preconditioner, "preconditioner", {
    None = 0,
    Left = 1,
    Right = 2,
    Both = 3,
});

module_codes!(Jacobian, "jacobian", {
    Dense = 0,
    Sparse = 1,
    Numerical = 2,
});

/// Solver configuration record.
///
/// Every field has a documented default, so partial records deserialize:
///
/// ```
/// use diffeq_core::{LinearSolver, OptionsConfig};
///
/// let options = OptionsConfig::new()
///     .with_linear_solver(LinearSolver::Klu)
///     .with_mxsteps(1000);
///
/// assert_eq!(options.linear_solver, LinearSolver::Klu);
/// assert_eq!(options.mxsteps, 1000);
/// assert_eq!(options.atol, 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct OptionsConfig {
    /// Report only at the caller-supplied times instead of also reporting
    /// the integrator's internal steps.
    pub fixed_times: bool,

    /// Ask the module to print integration statistics to its stdout.
    pub print_stats: bool,

    /// Integrate forward sensitivities alongside the primary solve.
    pub fwd_sens: bool,

    /// Absolute error tolerance.
    pub atol: f64,

    /// Relative error tolerance.
    pub rtol: f64,

    /// Linear solver used by the integrator.
    pub linear_solver: LinearSolver,

    /// Preconditioner for iterative linear solvers.
    pub preconditioner: Preconditioner,

    /// Jacobian formation strategy.
    pub jacobian: Jacobian,

    /// Iteration cap for iterative linear solvers.
    pub linsol_max_iterations: u32,

    /// Enable module debug output.
    pub debug: bool,

    /// Step budget before a solve is aborted as non-convergent.
    pub mxsteps: u32,

    /// Lower bound on the step size.
    pub min_step: f64,

    /// Upper bound on the step size.
    pub max_step: f64,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            fixed_times: false,
            print_stats: false,
            fwd_sens: false,
            atol: 1e-6,
            rtol: 1e-6,
            linear_solver: LinearSolver::Dense,
            preconditioner: Preconditioner::None,
            jacobian: Jacobian::Dense,
            linsol_max_iterations: 100,
            debug: false,
            mxsteps: 500,
            min_step: 0.0,
            max_step: f64::MAX,
        }
    }
}

impl OptionsConfig {
    /// Creates a record with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixed_times(mut self, fixed_times: bool) -> Self {
        self.fixed_times = fixed_times;
        self
    }

    pub fn with_print_stats(mut self, print_stats: bool) -> Self {
        self.print_stats = print_stats;
        self
    }

    pub fn with_fwd_sens(mut self, fwd_sens: bool) -> Self {
        self.fwd_sens = fwd_sens;
        self
    }

    /// Sets both tolerances.
    pub fn with_tolerances(mut self, atol: f64, rtol: f64) -> Self {
        self.atol = atol;
        self.rtol = rtol;
        self
    }

    pub fn with_linear_solver(mut self, linear_solver: LinearSolver) -> Self {
        self.linear_solver = linear_solver;
        self
    }

    pub fn with_preconditioner(mut self, preconditioner: Preconditioner) -> Self {
        self.preconditioner = preconditioner;
        self
    }

    pub fn with_jacobian(mut self, jacobian: Jacobian) -> Self {
        self.jacobian = jacobian;
        self
    }

    pub fn with_linsol_max_iterations(mut self, iterations: u32) -> Self {
        self.linsol_max_iterations = iterations;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_mxsteps(mut self, mxsteps: u32) -> Self {
        self.mxsteps = mxsteps;
        self
    }

    /// Sets the step-size bounds.
    pub fn with_step_bounds(mut self, min_step: f64, max_step: f64) -> Self {
        self.min_step = min_step;
        self.max_step = max_step;
        self
    }
}
