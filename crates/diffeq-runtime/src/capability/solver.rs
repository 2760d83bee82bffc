use super::{Binder, Capability, Requirement};

/// Operations on the module's solver object.
#[derive(Debug)]
pub struct SolverOps {
    pub(crate) create: Capability<(), i32>,
    pub(crate) destroy: Capability<i32, ()>,
    pub(crate) init: Capability<(i32, i32), ()>,
    pub(crate) solve: Capability<(i32, i32, i32, i32, i32, i32), i32>,
    pub(crate) number_of_states: Capability<i32, i32>,
    pub(crate) number_of_inputs: Capability<i32, i32>,
    pub(crate) number_of_outputs: Capability<i32, i32>,
}

impl SolverOps {
    pub(crate) fn bind(binder: &mut Binder<'_>) -> Self {
        Self {
            create: binder.func("Sundials_create", Requirement::Required),
            destroy: binder.func("Sundials_destroy", Requirement::Required),
            init: binder.func("Sundials_init", Requirement::Required),
            solve: binder.func("Sundials_solve", Requirement::Required),
            number_of_states: binder.func("Sundials_number_of_states", Requirement::Required),
            number_of_inputs: binder.func("Sundials_number_of_inputs", Requirement::Required),
            number_of_outputs: binder.func("Sundials_number_of_outputs", Requirement::Required),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.create.is_available()
            && self.init.is_available()
            && self.solve.is_available()
            && self.number_of_inputs.is_available()
            && self.number_of_outputs.is_available()
            && self.number_of_states.is_available()
    }
}
