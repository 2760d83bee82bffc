use std::sync::Arc;

use diffeq_core::{DiffeqError, Result};

use super::{reported_count, HandleError, Options, Vector};
use crate::capability::SolverOps;
use crate::ledger::{HandleKind, InstanceId, RawHandle};
use crate::session::Session;

/// Problem dimensions reported by an initialized solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverCounts {
    pub inputs: usize,
    pub outputs: usize,
    pub states: usize,
}

/// A solver object that has been created but not initialized.
#[derive(Debug)]
pub struct UninitSolver {
    raw: RawHandle,
    ops: Arc<SolverOps>,
}

impl UninitSolver {
    pub fn create(s: &mut Session<'_>) -> Result<Self> {
        let ops = Arc::clone(&s.model().capabilities().solver);
        let ptr = ops.create.call(s.store(), ())?;
        Ok(Self {
            raw: s.adopt(HandleKind::Solver, ptr),
            ops,
        })
    }

    pub fn instance_id(&self) -> InstanceId {
        self.raw.instance
    }

    /// Initializes the solver with `options` and queries its dimensions.
    ///
    /// If the session rejects the solver or `options`, the uninitialized
    /// solver is returned inside the error. Any later failure destroys the
    /// solver object.
    pub fn init(
        self,
        s: &mut Session<'_>,
        options: &Options,
    ) -> std::result::Result<Solver, HandleError<Self>> {
        if let Err(e) = s.check(&self.raw).and_then(|()| options.check(s)) {
            return Err(HandleError::rejected(e, self));
        }
        match self.prepare(s, options) {
            Ok((counts, placeholder)) => {
                tracing::debug!(
                    event = "solver_initialized",
                    ptr = self.raw.ptr,
                    inputs = counts.inputs,
                    outputs = counts.outputs,
                    states = counts.states
                );
                Ok(Solver {
                    raw: self.raw,
                    ops: self.ops,
                    counts,
                    placeholder,
                })
            }
            Err(e) => {
                let ptr = self.raw.ptr;
                if let Err(cleanup) = self.destroy(s) {
                    tracing::warn!(event = "discard_failed", kind = "Solver", ptr, error = %cleanup);
                }
                Err(HandleError::consumed(e))
            }
        }
    }

    fn prepare(&self, s: &mut Session<'_>, options: &Options) -> Result<(SolverCounts, Vector)> {
        let ptr = self.raw.ptr;
        self.ops.init.call(s.store(), (ptr, options.ptr()))?;
        let inputs = self.ops.number_of_inputs.call(s.store(), ptr)?;
        let outputs = self.ops.number_of_outputs.call(s.store(), ptr)?;
        let states = self.ops.number_of_states.call(s.store(), ptr)?;
        let counts = SolverCounts {
            inputs: reported_count("number_of_inputs", inputs)? as usize,
            outputs: reported_count("number_of_outputs", outputs)? as usize,
            states: reported_count("number_of_states", states)? as usize,
        };
        let placeholder = Vector::from_slice(s, &[])?;
        Ok((counts, placeholder))
    }

    pub fn destroy(self, s: &mut Session<'_>) -> std::result::Result<(), HandleError<Self>> {
        if let Err(e) = s.check(&self.raw) {
            return Err(HandleError::rejected(e, self));
        }
        let destroyed = self.ops.destroy.call(s.store(), self.raw.ptr);
        s.release(&self.raw)
            .and(destroyed)
            .map_err(HandleError::consumed)
    }
}

/// An initialized solver.
///
/// The solver never owns the vectors or options passed to it.
#[derive(Debug)]
pub struct Solver {
    raw: RawHandle,
    ops: Arc<SolverOps>,
    counts: SolverCounts,
    placeholder: Vector,
}

impl Solver {
    /// Creates and initializes a solver in one step.
    ///
    /// # Examples
    ///
    /// ```
    /// use diffeq_core::OptionsConfig;
    /// use diffeq_runtime::{Options, Sandbox, Solver, Vector};
    /// use diffeq_test::{logistic_module, Variant};
    ///
    /// let model = Sandbox::default()
    ///     .instantiate(&logistic_module(Variant::SelfLimiting), None)
    ///     .unwrap();
    ///
    /// model
    ///     .scoped(|s| {
    ///         let options = Options::create(s, &OptionsConfig::default())?;
    ///         let solver = Solver::new(s, &options)?;
    ///         let times = Vector::from_slice(s, &[0.0, 1.0, 2.0])?;
    ///         let inputs = Vector::from_slice(s, &[1.0, 2.0])?;
    ///         let mut outputs = Vector::empty(s)?;
    ///
    ///         solver.solve(s, &times, &inputs, &mut outputs)?;
    ///         assert_eq!(outputs.len(s)?, 3 * solver.number_of_outputs());
    ///         Ok(())
    ///     })
    ///     .unwrap();
    /// ```
    pub fn new(s: &mut Session<'_>, options: &Options) -> Result<Self> {
        UninitSolver::create(s)?.init(s, options).map_err(|err| {
            let (e, rejected) = err.into_parts();
            if let Some(solver) = rejected {
                let ptr = solver.raw.ptr;
                if let Err(cleanup) = solver.destroy(s) {
                    tracing::warn!(event = "discard_failed", kind = "Solver", ptr, error = %cleanup);
                }
            }
            e
        })
    }

    pub fn instance_id(&self) -> InstanceId {
        self.raw.instance
    }

    pub fn counts(&self) -> SolverCounts {
        self.counts
    }

    pub fn number_of_inputs(&self) -> usize {
        self.counts.inputs
    }

    pub fn number_of_outputs(&self) -> usize {
        self.counts.outputs
    }

    pub fn number_of_states(&self) -> usize {
        self.counts.states
    }

    /// Integrates the model at `times` for `inputs`, writing into `outputs`.
    ///
    /// The module resizes `outputs` to hold one row of outputs per time point.
    ///
    /// # Errors
    ///
    /// `Precondition` if `inputs` does not match the model's input count or
    /// `times` has fewer than two entries, checked before the module runs.
    /// `SolveFailure` if the module reports a non-zero code; its detail is the
    /// module's stderr since the last read.
    pub fn solve(
        &self,
        s: &mut Session<'_>,
        times: &Vector,
        inputs: &Vector,
        outputs: &mut Vector,
    ) -> Result<()> {
        self.check_problem(s, times, inputs, outputs)?;
        self.run(s, times, inputs, &self.placeholder, outputs, &self.placeholder)
    }

    /// Like [`Solver::solve`], additionally propagating the input direction
    /// `dinputs` into `doutputs`.
    pub fn solve_with_sensitivities(
        &self,
        s: &mut Session<'_>,
        times: &Vector,
        inputs: &Vector,
        dinputs: &Vector,
        outputs: &mut Vector,
        doutputs: &mut Vector,
    ) -> Result<()> {
        self.check_problem(s, times, inputs, outputs)?;
        dinputs.check(s)?;
        doutputs.check(s)?;
        let expected = inputs.len(s)?;
        let got = dinputs.len(s)?;
        if got != expected {
            return Err(DiffeqError::Precondition(format!(
                "Expected {expected} input sensitivities, got {got}"
            )));
        }
        self.run(s, times, inputs, dinputs, outputs, doutputs)
    }

    fn check_problem(
        &self,
        s: &mut Session<'_>,
        times: &Vector,
        inputs: &Vector,
        outputs: &Vector,
    ) -> Result<()> {
        s.check(&self.raw)?;
        times.check(s)?;
        inputs.check(s)?;
        outputs.check(s)?;

        let got = inputs.len(s)?;
        if got != self.counts.inputs {
            return Err(DiffeqError::Precondition(format!(
                "Expected {} inputs, got {got}",
                self.counts.inputs
            )));
        }
        if times.len(s)? < 2 {
            return Err(DiffeqError::Precondition(
                "Times vector must have at least two elements".to_string(),
            ));
        }
        Ok(())
    }

    fn run(
        &self,
        s: &mut Session<'_>,
        times: &Vector,
        inputs: &Vector,
        dinputs: &Vector,
        outputs: &Vector,
        doutputs: &Vector,
    ) -> Result<()> {
        let code = self.ops.solve.call(
            s.store(),
            (
                self.raw.ptr,
                times.ptr(),
                inputs.ptr(),
                dinputs.ptr(),
                outputs.ptr(),
                doutputs.ptr(),
            ),
        )?;
        if code != 0 {
            let detail = s.read_stderr();
            tracing::warn!(
                event = "solve_failed",
                model = s.model().display_id(),
                code,
                detail = %detail.trim_end(),
                "Solver returned an error code"
            );
            return Err(DiffeqError::SolveFailure { code, detail });
        }
        tracing::debug!(event = "solve_complete", model = s.model().display_id());
        Ok(())
    }

    /// Releases the solver object and its internal placeholder vector.
    ///
    /// A solver the session rejects is handed back inside the error.
    pub fn destroy(self, s: &mut Session<'_>) -> std::result::Result<(), HandleError<Self>> {
        if let Err(e) = s.check(&self.raw).and_then(|()| self.placeholder.check(s)) {
            return Err(HandleError::rejected(e, self));
        }
        let destroyed = self.ops.destroy.call(s.store(), self.raw.ptr);
        let released = s.release(&self.raw);
        let placeholder = self.placeholder.destroy(s).map_err(DiffeqError::from);
        destroyed
            .and(released)
            .and(placeholder)
            .map_err(HandleError::consumed)
    }
}
