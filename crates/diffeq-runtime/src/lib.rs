//! Sandboxed hosting of compiled ODE solver modules.
//!
//! A compiled model is a WASM binary exporting vector, options and solver
//! operations by name. This crate:
//! - instantiates the binary in an isolated WASI sandbox ([`Sandbox`])
//! - binds its exports into operation groups ([`Capabilities`])
//! - serializes access to each instance through a [`Session`]
//! - wraps module objects in typed, non-copyable handles
//!   ([`Vector`], [`Options`], [`UninitSolver`], [`Solver`])
//!
//! # Example
//!
//! ```
//! use diffeq_core::OptionsConfig;
//! use diffeq_runtime::{Options, Sandbox, Solver, Vector};
//! use diffeq_test::{logistic_module, Variant};
//!
//! let model = Sandbox::default()
//!     .instantiate(&logistic_module(Variant::SelfLimiting), Some("logistic".into()))
//!     .unwrap();
//!
//! let mut s = model.session();
//! let options = Options::create(&mut s, &OptionsConfig::default()).unwrap();
//! let solver = Solver::new(&mut s, &options).unwrap();
//! let times = Vector::from_slice(&mut s, &[0.0, 2.0]).unwrap();
//! let inputs = Vector::from_slice(&mut s, &[1.0, 2.0]).unwrap();
//! let mut outputs = Vector::zeros(&mut s, 0).unwrap();
//!
//! solver.solve(&mut s, &times, &inputs, &mut outputs).unwrap();
//! let y = outputs.view(&mut s).unwrap()[2];
//! assert!((y - 1.7616).abs() < 1e-2);
//!
//! solver.destroy(&mut s).unwrap();
//! options.destroy(&mut s).unwrap();
//! for v in [times, inputs, outputs] {
//!     v.destroy(&mut s).unwrap();
//! }
//! assert_eq!(s.live_handles(), 0);
//! ```

pub mod capability;
pub mod handle;
pub mod ledger;
pub mod memory;
pub mod model;
pub mod sandbox;
pub mod session;
pub mod stream;

pub use capability::{Capabilities, CapabilityGap, CapabilityReport, GapKind, Requirement};
pub use handle::{HandleError, Options, Solver, SolverCounts, UninitSolver, Vector};
pub use ledger::{HandleKind, InstanceId};
pub use memory::{f64_view, f64_view_mut};
pub use model::{ModelInstance, DEFAULT_MODEL_ID};
pub use sandbox::{HostState, Sandbox};
pub use session::Session;
pub use stream::CapturedStream;
