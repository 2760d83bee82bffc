use std::sync::Arc;

use diffeq_core::{DiffeqError, Jacobian, LinearSolver, OptionsConfig, Preconditioner, Result};

use super::{reported_count, HandleError};
use crate::capability::OptionsOps;
use crate::ledger::{HandleKind, InstanceId, RawHandle};
use crate::session::Session;

/// A solver options block living in module memory.
///
/// Accessors query the module every time; nothing is cached host-side.
#[derive(Debug)]
pub struct Options {
    raw: RawHandle,
    ops: Arc<OptionsOps>,
}

fn flag(value: bool) -> i32 {
    i32::from(value)
}

fn count(option: &'static str, value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        DiffeqError::Precondition(format!("{option} {value} exceeds the module's 32-bit range"))
    })
}

impl Options {
    /// Creates an options block and applies every field of `config`.
    ///
    /// Setters run in declaration order of [`OptionsConfig`].
    pub fn create(s: &mut Session<'_>, config: &OptionsConfig) -> Result<Self> {
        let ops = Arc::clone(&s.model().capabilities().options);
        let ptr = ops.create.call(s.store(), ())?;
        let options = Self {
            raw: s.adopt(HandleKind::Options, ptr),
            ops,
        };
        match options.apply(s, config) {
            Ok(()) => Ok(options),
            Err(e) => {
                let ptr = options.raw.ptr;
                if let Err(cleanup) = options.destroy(s) {
                    tracing::warn!(event = "discard_failed", kind = "Options", ptr, error = %cleanup);
                }
                Err(e)
            }
        }
    }

    fn apply(&self, s: &mut Session<'_>, config: &OptionsConfig) -> Result<()> {
        let ptr = self.raw.ptr;
        let ops = &self.ops;
        let store = s.store();
        ops.set_fixed_times.call(&mut *store, (ptr, flag(config.fixed_times)))?;
        ops.set_print_stats.call(&mut *store, (ptr, flag(config.print_stats)))?;
        ops.set_fwd_sens.call(&mut *store, (ptr, flag(config.fwd_sens)))?;
        ops.set_atol.call(&mut *store, (ptr, config.atol))?;
        ops.set_rtol.call(&mut *store, (ptr, config.rtol))?;
        ops.set_linear_solver.call(&mut *store, (ptr, config.linear_solver.code()))?;
        ops.set_preconditioner.call(&mut *store, (ptr, config.preconditioner.code()))?;
        ops.set_jacobian.call(&mut *store, (ptr, config.jacobian.code()))?;
        ops.set_linsol_max_iterations.call(
            &mut *store,
            (ptr, count("linsol_max_iterations", config.linsol_max_iterations)?),
        )?;
        ops.set_debug.call(&mut *store, (ptr, flag(config.debug)))?;
        ops.set_mxsteps.call(&mut *store, (ptr, count("mxsteps", config.mxsteps)?))?;
        ops.set_min_step.call(&mut *store, (ptr, config.min_step))?;
        ops.set_max_step.call(&mut *store, (ptr, config.max_step))?;
        Ok(())
    }

    pub fn instance_id(&self) -> InstanceId {
        self.raw.instance
    }

    pub(crate) fn ptr(&self) -> i32 {
        self.raw.ptr
    }

    pub(crate) fn check(&self, s: &Session<'_>) -> Result<()> {
        s.check(&self.raw)
    }

    pub fn fixed_times(&self, s: &mut Session<'_>) -> Result<bool> {
        s.check(&self.raw)?;
        Ok(self.ops.get_fixed_times.call(s.store(), self.raw.ptr)? != 0)
    }

    pub fn print_stats(&self, s: &mut Session<'_>) -> Result<bool> {
        s.check(&self.raw)?;
        Ok(self.ops.get_print_stats.call(s.store(), self.raw.ptr)? != 0)
    }

    pub fn fwd_sens(&self, s: &mut Session<'_>) -> Result<bool> {
        s.check(&self.raw)?;
        Ok(self.ops.get_fwd_sens.call(s.store(), self.raw.ptr)? != 0)
    }

    pub fn atol(&self, s: &mut Session<'_>) -> Result<f64> {
        s.check(&self.raw)?;
        self.ops.get_atol.call(s.store(), self.raw.ptr)
    }

    pub fn rtol(&self, s: &mut Session<'_>) -> Result<f64> {
        s.check(&self.raw)?;
        self.ops.get_rtol.call(s.store(), self.raw.ptr)
    }

    pub fn linear_solver(&self, s: &mut Session<'_>) -> Result<LinearSolver> {
        s.check(&self.raw)?;
        LinearSolver::try_from(self.ops.get_linear_solver.call(s.store(), self.raw.ptr)?)
    }

    pub fn preconditioner(&self, s: &mut Session<'_>) -> Result<Preconditioner> {
        s.check(&self.raw)?;
        Preconditioner::try_from(self.ops.get_preconditioner.call(s.store(), self.raw.ptr)?)
    }

    pub fn jacobian(&self, s: &mut Session<'_>) -> Result<Jacobian> {
        s.check(&self.raw)?;
        Jacobian::try_from(self.ops.get_jacobian.call(s.store(), self.raw.ptr)?)
    }

    pub fn linsol_max_iterations(&self, s: &mut Session<'_>) -> Result<u32> {
        s.check(&self.raw)?;
        let value = self
            .ops
            .get_linsol_max_iterations
            .call(s.store(), self.raw.ptr)?;
        reported_count("linsol_max_iterations", value)
    }

    pub fn debug(&self, s: &mut Session<'_>) -> Result<bool> {
        s.check(&self.raw)?;
        Ok(self.ops.get_debug.call(s.store(), self.raw.ptr)? != 0)
    }

    pub fn mxsteps(&self, s: &mut Session<'_>) -> Result<u32> {
        s.check(&self.raw)?;
        let value = self.ops.get_mxsteps.call(s.store(), self.raw.ptr)?;
        reported_count("mxsteps", value)
    }

    pub fn min_step(&self, s: &mut Session<'_>) -> Result<f64> {
        s.check(&self.raw)?;
        self.ops.get_min_step.call(s.store(), self.raw.ptr)
    }

    pub fn max_step(&self, s: &mut Session<'_>) -> Result<f64> {
        s.check(&self.raw)?;
        self.ops.get_max_step.call(s.store(), self.raw.ptr)
    }

    /// Reads every field back from the module.
    pub fn read(&self, s: &mut Session<'_>) -> Result<OptionsConfig> {
        Ok(OptionsConfig {
            fixed_times: self.fixed_times(s)?,
            print_stats: self.print_stats(s)?,
            fwd_sens: self.fwd_sens(s)?,
            atol: self.atol(s)?,
            rtol: self.rtol(s)?,
            linear_solver: self.linear_solver(s)?,
            preconditioner: self.preconditioner(s)?,
            jacobian: self.jacobian(s)?,
            linsol_max_iterations: self.linsol_max_iterations(s)?,
            debug: self.debug(s)?,
            mxsteps: self.mxsteps(s)?,
            min_step: self.min_step(s)?,
            max_step: self.max_step(s)?,
        })
    }

    /// Releases the module object. A rejected handle is returned in the error.
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
