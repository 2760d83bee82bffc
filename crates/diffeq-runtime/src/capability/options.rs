use super::{Binder, Capability, Requirement};

macro_rules! options_ops {
    ($($field:ident: $ty:ty => $set:ident, $get:ident;)*) => {
        /// Operations on the module's options block.
        ///
        /// Every tunable has a required setter and an optional getter.
        #[derive(Debug)]
        pub struct OptionsOps {
            pub(crate) create: Capability<(), i32>,
            pub(crate) destroy: Capability<i32, ()>,
            $(
                pub(crate) $set: Capability<(i32, $ty), ()>,
                pub(crate) $get: Capability<i32, $ty>,
            )*
        }

        impl OptionsOps {
            pub(crate) fn bind(binder: &mut Binder<'_>) -> Self {
                Self {
                    create: binder.func("Options_create", Requirement::Required),
                    destroy: binder.func("Options_destroy", Requirement::Required),
                    $(
                        $set: binder.func(
                            concat!("Options_set_", stringify!($field)),
                            Requirement::Required,
                        ),
                        $get: binder.func(
                            concat!("Options_get_", stringify!($field)),
                            Requirement::Optional,
                        ),
                    )*
                }
            }

            /// Returns true when every getter is exported, so the block can be read back.
            pub fn is_readable(&self) -> bool {
                true $(&& self.$get.is_available())*
            }
        }
    };
}

options_ops! {
    fixed_times: i32 => set_fixed_times, get_fixed_times;
    print_stats: i32 => set_print_stats, get_print_stats;
    fwd_sens: i32 => set_fwd_sens, get_fwd_sens;
    atol: f64 => set_atol, get_atol;
    rtol: f64 => set_rtol, get_rtol;
    linear_solver: i32 => set_linear_solver, get_linear_solver;
    preconditioner: i32 => set_preconditioner, get_preconditioner;
    jacobian: i32 => set_jacobian, get_jacobian;
    linsol_max_iterations: i32 => set_linsol_max_iterations, get_linsol_max_iterations;
    debug: i32 => set_debug, get_debug;
    mxsteps: i32 => set_mxsteps, get_mxsteps;
    min_step: f64 => set_min_step, get_min_step;
    max_step: f64 => set_max_step, get_max_step;
}
