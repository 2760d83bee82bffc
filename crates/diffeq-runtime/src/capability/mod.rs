//! Export-table binding.
//!
//! A compiled model exposes its functionality through exports with fixed
//! names. At instantiation every known name is looked up once, type-checked,
//! and bound into one of three groups. Absent or mistyped exports are
//! recorded in a [`CapabilityReport`] instead of failing the load; calling
//! one of them later yields [`DiffeqError::MissingCapability`].

mod options;
mod solver;
mod vector;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use diffeq_core::{DiffeqError, Result};
use wasmtime::{Instance, Memory, Store, TypedFunc, WasmParams, WasmResults};

use crate::sandbox::HostState;

pub use options::OptionsOps;
pub use solver::SolverOps;
pub use vector::VectorOps;

/// Whether a module must export an operation to be considered complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
}

/// A single bound export, or the record that it could not be bound.
pub(crate) struct Capability<P, R> {
    name: &'static str,
    func: Option<TypedFunc<P, R>>,
}

impl<P, R> Capability<P, R>
where
    P: WasmParams,
    R: WasmResults,
{
    pub(crate) fn call(&self, store: &mut Store<HostState>, params: P) -> Result<R> {
        let func = self
            .func
            .as_ref()
            .ok_or(DiffeqError::MissingCapability { name: self.name })?;
        func.call(store, params).map_err(|e| DiffeqError::Trap {
            operation: self.name,
            message: format!("{e:#}"),
        })
    }

    pub(crate) fn is_available(&self) -> bool {
        self.func.is_some()
    }
}

impl<P, R> fmt::Debug for Capability<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("available", &self.func.is_some())
            .finish()
    }
}

/// Why an export could not be bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GapKind {
    Missing,
    SignatureMismatch(String),
}

/// An export the module does not provide in usable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityGap {
    pub name: &'static str,
    pub requirement: Requirement,
    pub kind: GapKind,
}

impl fmt::Display for CapabilityGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            GapKind::Missing => write!(f, "{} is not exported", self.name),
            GapKind::SignatureMismatch(detail) => {
                write!(f, "{} has the wrong signature: {}", self.name, detail)
            }
        }
    }
}

/// Outcome of binding a module's exports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityReport {
    bound: Vec<&'static str>,
    gaps: Vec<CapabilityGap>,
}

impl CapabilityReport {
    /// Returns true when every required export was bound.
    pub fn is_complete(&self) -> bool {
        self.required_gaps().next().is_none()
    }

    pub fn bound(&self) -> &[&'static str] {
        &self.bound
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bound.iter().any(|bound| *bound == name)
    }

    pub fn gaps(&self) -> &[CapabilityGap] {
        &self.gaps
    }

    pub fn required_gaps(&self) -> impl Iterator<Item = &CapabilityGap> {
        self.gaps
            .iter()
            .filter(|gap| gap.requirement == Requirement::Required)
    }
}

impl fmt::Display for CapabilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} exports bound", self.bound.len())?;
        if !self.gaps.is_empty() {
            let gaps: Vec<String> = self.gaps.iter().map(ToString::to_string).collect();
            write!(f, "; {}", gaps.join("; "))?;
        }
        Ok(())
    }
}

/// Looks up exports by name and records the result in a report.
pub(crate) struct Binder<'a> {
    instance: Instance,
    store: &'a mut Store<HostState>,
    report: CapabilityReport,
}

impl<'a> Binder<'a> {
    pub(crate) fn new(instance: Instance, store: &'a mut Store<HostState>) -> Self {
        Self {
            instance,
            store,
            report: CapabilityReport::default(),
        }
    }

    pub(crate) fn func<P, R>(&mut self, name: &'static str, requirement: Requirement) -> Capability<P, R>
    where
        P: WasmParams,
        R: WasmResults,
    {
        let Some(func) = self.instance.get_func(&mut *self.store, name) else {
            self.gap(name, requirement, GapKind::Missing);
            return Capability { name, func: None };
        };
        match func.typed::<P, R>(&*self.store) {
            Ok(typed) => {
                self.report.bound.push(name);
                Capability {
                    name,
                    func: Some(typed),
                }
            }
            Err(e) => {
                self.gap(name, requirement, GapKind::SignatureMismatch(format!("{e:#}")));
                Capability { name, func: None }
            }
        }
    }

    pub(crate) fn memory(&mut self, name: &'static str) -> Option<Memory> {
        match self.instance.get_memory(&mut *self.store, name) {
            Some(memory) => {
                self.report.bound.push(name);
                Some(memory)
            }
            None => {
                self.gap(name, Requirement::Required, GapKind::Missing);
                None
            }
        }
    }

    fn gap(&mut self, name: &'static str, requirement: Requirement, kind: GapKind) {
        self.report.gaps.push(CapabilityGap {
            name,
            requirement,
            kind,
        });
    }

    pub(crate) fn finish(self) -> CapabilityReport {
        self.report
    }
}

/// The three operation groups of one model instance.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub(crate) vector: Arc<VectorOps>,
    pub(crate) options: Arc<OptionsOps>,
    pub(crate) solver: Arc<SolverOps>,
}

impl Capabilities {
    /// Binds every known export of `instance`.
    pub(crate) fn extract(
        instance: Instance,
        store: &mut Store<HostState>,
    ) -> (Self, CapabilityReport) {
        let mut binder = Binder::new(instance, store);
        let capabilities = Self {
            vector: Arc::new(VectorOps::bind(&mut binder)),
            options: Arc::new(OptionsOps::bind(&mut binder)),
            solver: Arc::new(SolverOps::bind(&mut binder)),
        };
        let report = binder.finish();

        for gap in &report.gaps {
            match gap.requirement {
                Requirement::Required => tracing::warn!(
                    event = "capability_gap",
                    export = gap.name,
                    "{gap}"
                ),
                Requirement::Optional => tracing::debug!(
                    event = "optional_capability_absent",
                    export = gap.name,
                    "{gap}"
                ),
            }
        }

        (capabilities, report)
    }

    pub fn vector(&self) -> &VectorOps {
        &self.vector
    }

    pub fn options(&self) -> &OptionsOps {
        &self.options
    }

    pub fn solver(&self) -> &SolverOps {
        &self.solver
    }
}
