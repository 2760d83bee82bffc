use wasmtime::Memory;

use super::{Binder, Capability, Requirement};

/// Operations on growable f64 vectors living in module memory.
#[derive(Debug)]
pub struct VectorOps {
    pub(crate) create: Capability<(), i32>,
    pub(crate) create_with_capacity: Capability<(i32, i32), i32>,
    pub(crate) push: Capability<(i32, f64), ()>,
    pub(crate) get: Capability<(i32, i32), f64>,
    pub(crate) set: Capability<(i32, i32, f64), ()>,
    pub(crate) resize: Capability<(i32, i32), ()>,
    pub(crate) destroy: Capability<i32, ()>,
    pub(crate) get_length: Capability<i32, i32>,
    pub(crate) get_data: Capability<i32, i32>,
    pub(crate) linspace_create: Capability<(f64, f64, i32), i32>,
    pub(crate) memory: Option<Memory>,
}

impl VectorOps {
    pub(crate) fn bind(binder: &mut Binder<'_>) -> Self {
        use Requirement::{Optional, Required};

        Self {
            create: binder.func("Vector_create", Optional),
            create_with_capacity: binder.func("Vector_create_with_capacity", Required),
            push: binder.func("Vector_push", Required),
            get: binder.func("Vector_get", Required),
            set: binder.func("Vector_set", Required),
            resize: binder.func("Vector_resize", Required),
            destroy: binder.func("Vector_destroy", Required),
            get_length: binder.func("Vector_get_length", Required),
            get_data: binder.func("Vector_get_data", Required),
            linspace_create: binder.func("Vector_linspace_create", Optional),
            memory: binder.memory("memory"),
        }
    }

    /// Returns true when vectors can be created, filled and viewed.
    pub fn is_usable(&self) -> bool {
        self.create_with_capacity.is_available()
            && self.push.is_available()
            && self.get_length.is_available()
            && self.get_data.is_available()
            && self.memory.is_some()
    }
}
