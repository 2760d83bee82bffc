//! Exclusive access to one model instance.

use std::sync::MutexGuard;

use diffeq_core::{DiffeqError, Result};
use wasmtime::{Memory, Store};

use crate::ledger::{HandleKind, InstanceId, RawHandle};
use crate::model::ModelInstance;
use crate::sandbox::HostState;

/// An open session on a [`ModelInstance`].
///
/// Every handle operation takes `&mut Session`. Memory views borrow the
/// session, so no module call can run while a view is alive.
pub struct Session<'m> {
    model: &'m ModelInstance,
    store: MutexGuard<'m, Store<HostState>>,
}

impl<'m> Session<'m> {
    pub(crate) fn new(model: &'m ModelInstance, store: MutexGuard<'m, Store<HostState>>) -> Self {
        Self { model, store }
    }

    pub fn model(&self) -> &'m ModelInstance {
        self.model
    }

    pub fn instance_id(&self) -> InstanceId {
        self.model.instance_id()
    }

    /// Returns stdout written by the module since the previous call.
    pub fn read_stdout(&mut self) -> String {
        self.store.data_mut().stdout.read_to_string()
    }

    /// Returns stderr written by the module since the previous call.
    pub fn read_stderr(&mut self) -> String {
        self.store.data_mut().stderr.read_to_string()
    }

    /// Number of module objects created through handles and not yet destroyed.
    pub fn live_handles(&self) -> usize {
        self.store.data().ledger.len()
    }

    pub fn live_handles_of(&self, kind: HandleKind) -> usize {
        self.store.data().ledger.count(kind)
    }

    /// Current size of linear memory in bytes, or zero if none is exported.
    pub fn memory_size(&self) -> usize {
        self.model
            .capabilities()
            .vector
            .memory
            .map_or(0, |memory| memory.data_size(&*self.store))
    }

    pub(crate) fn store(&mut self) -> &mut Store<HostState> {
        &mut self.store
    }

    pub(crate) fn memory_bytes(&self, memory: Memory) -> &[u8] {
        memory.data(&*self.store)
    }

    pub(crate) fn memory_bytes_mut(&mut self, memory: Memory) -> &mut [u8] {
        memory.data_mut(&mut *self.store)
    }

    pub(crate) fn check(&self, raw: &RawHandle) -> Result<()> {
        if raw.instance != self.instance_id() {
            return Err(DiffeqError::CrossInstanceHandle {
                expected: self.instance_id().get(),
                found: raw.instance.get(),
            });
        }
        self.store.data().ledger.check(raw.kind, raw.ptr, raw.generation)
    }

    pub(crate) fn adopt(&mut self, kind: HandleKind, ptr: i32) -> RawHandle {
        let generation = self.store.data_mut().ledger.adopt(kind, ptr);
        tracing::debug!(
            event = "handle_created",
            kind = kind.name(),
            ptr,
            model = self.model.display_id()
        );
        RawHandle {
            ptr,
            kind,
            instance: self.instance_id(),
            generation,
        }
    }

    pub(crate) fn release(&mut self, raw: &RawHandle) -> Result<()> {
        self.check(raw)?;
        self.store
            .data_mut()
            .ledger
            .release(raw.kind, raw.ptr, raw.generation)?;
        tracing::debug!(
            event = "handle_destroyed",
            kind = raw.kind.name(),
            ptr = raw.ptr,
            model = self.model.display_id()
        );
        Ok(())
    }

    pub(crate) fn watermark(&self) -> u64 {
        self.store.data().ledger.watermark()
    }

    /// Destroys every live object adopted at or after `watermark`.
    ///
    /// Objects are forgotten by the ledger even when the module fails to
    /// destroy them. Returns the number of objects released.
    pub(crate) fn release_since(&mut self, watermark: u64) -> usize {
        let leftovers = self.store.data().ledger.adopted_since(watermark);
        for &(kind, ptr) in &leftovers {
            if let Err(e) = self.destroy_raw(kind, ptr) {
                tracing::warn!(
                    event = "release_failed",
                    kind = kind.name(),
                    ptr,
                    error = %e,
                    "Module failed to destroy leftover object"
                );
            }
            self.store.data_mut().ledger.forget(kind, ptr);
        }
        leftovers.len()
    }

    pub(crate) fn destroy_raw(&mut self, kind: HandleKind, ptr: i32) -> Result<()> {
        let capabilities = self.model.capabilities();
        match kind {
            HandleKind::Solver => capabilities.solver.destroy.call(&mut self.store, ptr),
            HandleKind::Options => capabilities.options.destroy.call(&mut self.store, ptr),
            HandleKind::Vector => capabilities.vector.destroy.call(&mut self.store, ptr),
        }
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("model", &self.model.display_id())
            .field("live_handles", &self.live_handles())
            .finish()
    }
}
