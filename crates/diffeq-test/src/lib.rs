//! Shared test fixtures for diffeq crates.
//!
//! This crate provides compiled fixture modules and an in-process compile
//! service. It does NOT depend on `diffeq-runtime` so the runtime can use it
//! as a dev-dependency.
//!
//! - [`logistic`] - logistic-growth model modules implementing the full export surface
//! - [`service`] - a compile service that maps known sources to fixture binaries
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! diffeq-test = { workspace = true }
//! ```
//!
//! Then import the fixtures you need:
//!
//! ```ignore
//! use diffeq_test::logistic::{logistic_module, Variant};
//! use diffeq_test::service::FixtureCompileService;
//! ```

pub mod logistic;
pub mod service;

pub use logistic::{logistic_module, setter_only_module, vector_only_module, Variant};
pub use service::{FixtureCompileService, CROSS_TERM_SOURCE, LOGISTIC_SOURCE};
