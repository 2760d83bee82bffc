use std::sync::Arc;

use diffeq_core::{DiffeqError, Result};
use wasmtime::Memory;

use super::{from_module, to_module, HandleError};
use crate::capability::VectorOps;
use crate::ledger::{HandleKind, InstanceId, RawHandle};
use crate::memory::{f64_view, f64_view_mut};
use crate::session::Session;

/// A growable f64 vector living in module memory.
#[derive(Debug)]
pub struct Vector {
    raw: RawHandle,
    ops: Arc<VectorOps>,
}

impl Vector {
    fn adopt(s: &mut Session<'_>, ptr: i32) -> Self {
        let ops = Arc::clone(&s.model().capabilities().vector);
        Self {
            raw: s.adopt(HandleKind::Vector, ptr),
            ops,
        }
    }

    /// Creates an empty vector.
    pub fn empty(s: &mut Session<'_>) -> Result<Self> {
        let ops = Arc::clone(&s.model().capabilities().vector);
        let ptr = ops.create.call(s.store(), ())?;
        Ok(Self::adopt(s, ptr))
    }

    /// Creates an empty vector with room for `capacity` values.
    pub fn with_capacity(s: &mut Session<'_>, capacity: usize) -> Result<Self> {
        let capacity = to_module(capacity, "capacity")?;
        let ops = Arc::clone(&s.model().capabilities().vector);
        let ptr = ops.create_with_capacity.call(s.store(), (0, capacity))?;
        Ok(Self::adopt(s, ptr))
    }

    /// Copies `values` into a new vector, pushing them in order.
    pub fn from_slice(s: &mut Session<'_>, values: &[f64]) -> Result<Self> {
        let mut vector = Self::with_capacity(s, values.len())?;
        for &value in values {
            if let Err(e) = vector.push(s, value) {
                vector.discard(s);
                return Err(e);
            }
        }
        Ok(vector)
    }

    pub fn zeros(s: &mut Session<'_>, len: usize) -> Result<Self> {
        Self::from_slice(s, &vec![0.0; len])
    }

    /// Creates `n` evenly spaced values from `start` to `stop` inclusive.
    pub fn linspace(s: &mut Session<'_>, start: f64, stop: f64, n: usize) -> Result<Self> {
        let n = to_module(n, "length")?;
        let ops = Arc::clone(&s.model().capabilities().vector);
        let ptr = ops.linspace_create.call(s.store(), (start, stop, n))?;
        Ok(Self::adopt(s, ptr))
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

    /// Reads the value at `index`. Out-of-range indices are reported by the module.
    pub fn get(&self, s: &mut Session<'_>, index: usize) -> Result<f64> {
        s.check(&self.raw)?;
        let index = to_module(index, "index")?;
        self.ops.get.call(s.store(), (self.raw.ptr, index))
    }

    pub fn set(&mut self, s: &mut Session<'_>, index: usize, value: f64) -> Result<()> {
        s.check(&self.raw)?;
        let index = to_module(index, "index")?;
        self.ops.set.call(s.store(), (self.raw.ptr, index, value))
    }

    pub fn push(&mut self, s: &mut Session<'_>, value: f64) -> Result<()> {
        s.check(&self.raw)?;
        self.ops.push.call(s.store(), (self.raw.ptr, value))
    }

    pub fn resize(&mut self, s: &mut Session<'_>, len: usize) -> Result<()> {
        s.check(&self.raw)?;
        let len = to_module(len, "length")?;
        self.ops.resize.call(s.store(), (self.raw.ptr, len))
    }

    pub fn len(&self, s: &mut Session<'_>) -> Result<usize> {
        s.check(&self.raw)?;
        self.ops
            .get_length
            .call(s.store(), self.raw.ptr)
            .map(from_module)
    }

    pub fn is_empty(&self, s: &mut Session<'_>) -> Result<bool> {
        Ok(self.len(s)? == 0)
    }

    /// Borrows the vector's contents directly from linear memory.
    ///
    /// The slice lives as long as the session borrow, so the module cannot
    /// move the buffer while it is held.
    pub fn view<'s>(&self, s: &'s mut Session<'_>) -> Result<&'s [f64]> {
        let (memory, offset, len) = self.locate(s)?;
        f64_view(s.memory_bytes(memory), offset, len)
    }

    /// Mutable twin of [`Vector::view`].
    pub fn view_mut<'s>(&mut self, s: &'s mut Session<'_>) -> Result<&'s mut [f64]> {
        let (memory, offset, len) = self.locate(s)?;
        f64_view_mut(s.memory_bytes_mut(memory), offset, len)
    }

    pub fn to_vec(&self, s: &mut Session<'_>) -> Result<Vec<f64>> {
        self.view(s).map(<[f64]>::to_vec)
    }

    /// Releases the module object.
    ///
    /// A handle the session rejects is handed back inside the error, still
    /// owning its module object.
    ///
    /// # Examples
    ///
    /// ```
    /// use diffeq_runtime::{Sandbox, Vector};
    /// use diffeq_test::vector_only_module;
    ///
    /// let sandbox = Sandbox::default();
    /// let a = sandbox.instantiate(&vector_only_module(), None).unwrap();
    /// let b = sandbox.instantiate(&vector_only_module(), None).unwrap();
    ///
    /// let v = Vector::from_slice(&mut a.session(), &[1.0]).unwrap();
    /// let err = v.destroy(&mut b.session()).unwrap_err();
    /// let v = err.into_handle().unwrap();
    ///
    /// let mut s = a.session();
    /// v.destroy(&mut s).unwrap();
    /// assert_eq!(s.live_handles(), 0);
    /// ```
    pub fn destroy(self, s: &mut Session<'_>) -> std::result::Result<(), HandleError<Self>> {
        if let Err(e) = s.check(&self.raw) {
            return Err(HandleError::rejected(e, self));
        }
        let destroyed = self.ops.destroy.call(s.store(), self.raw.ptr);
        s.release(&self.raw)
            .and(destroyed)
            .map_err(HandleError::consumed)
    }

    /// Destroys during cleanup of a failed construction; errors are logged.
    pub(crate) fn discard(self, s: &mut Session<'_>) {
        let ptr = self.raw.ptr;
        if let Err(e) = self.destroy(s) {
            tracing::warn!(event = "discard_failed", kind = "Vector", ptr, error = %e.error());
        }
    }

    fn locate(&self, s: &mut Session<'_>) -> Result<(Memory, usize, usize)> {
        s.check(&self.raw)?;
        let memory = self
            .ops
            .memory
            .ok_or(DiffeqError::MissingCapability { name: "memory" })?;
        let len = from_module(self.ops.get_length.call(s.store(), self.raw.ptr)?);
        let data = from_module(self.ops.get_data.call(s.store(), self.raw.ptr)?);
        Ok((memory, data, len))
    }
}
