//! Tests for export binding.

use diffeq_config::SandboxConfig;
use diffeq_core::{DiffeqError, OptionsConfig};
use diffeq_test::{logistic_module, setter_only_module, vector_only_module, Variant};

use super::*;
use crate::handle::{Options, UninitSolver, Vector};
use crate::sandbox::Sandbox;

#[test]
fn test_complete_module_binds_everything() {
    let model = Sandbox::default()
        .instantiate(&logistic_module(Variant::SelfLimiting), None)
        .unwrap();
    let report = model.capability_report();

    assert!(report.is_complete());
    assert!(report.gaps().is_empty());
    // 10 vector operations + memory, 2 + 13 * 2 options operations, 7 solver operations.
    assert_eq!(report.bound().len(), 11 + 28 + 7);
    assert!(report.is_bound("memory"));
    assert!(report.is_bound("Options_get_max_step"));

    let capabilities = model.capabilities();
    assert!(capabilities.vector().is_usable());
    assert!(capabilities.options().is_readable());
    assert!(capabilities.solver().is_usable());
}

#[test]
fn test_partial_module_loads_with_gaps() {
    let model = Sandbox::default()
        .instantiate(&vector_only_module(), None)
        .unwrap();
    let report = model.capability_report();

    assert!(!report.is_complete());
    assert!(report.is_bound("Vector_push"));
    assert!(report
        .required_gaps()
        .any(|gap| gap.name == "Sundials_solve" && gap.kind == GapKind::Missing));
    assert!(report
        .gaps()
        .iter()
        .filter(|gap| gap.name.starts_with("Options_get_"))
        .all(|gap| gap.requirement == Requirement::Optional));
    assert!(!model.capabilities().solver().is_usable());
    assert!(report.to_string().contains("Options_create is not exported"));
}

#[test]
fn test_missing_operation_fails_when_invoked() {
    let model = Sandbox::default()
        .instantiate(&vector_only_module(), None)
        .unwrap();
    let mut s = model.session();

    let v = Vector::from_slice(&mut s, &[1.0, 2.0]).unwrap();
    assert_eq!(v.to_vec(&mut s).unwrap(), vec![1.0, 2.0]);

    let err = Options::create(&mut s, &OptionsConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        DiffeqError::MissingCapability { name: "Options_create" }
    ));
    let err = UninitSolver::create(&mut s).unwrap_err();
    assert!(matches!(
        err,
        DiffeqError::MissingCapability { name: "Sundials_create" }
    ));
    assert_eq!(s.live_handles(), 1);
}

#[test]
fn test_missing_getter_is_optional() {
    let model = Sandbox::default()
        .instantiate(&setter_only_module(Variant::SelfLimiting), None)
        .unwrap();
    assert!(model.capability_report().is_complete());
    assert!(!model.capabilities().options().is_readable());

    let mut s = model.session();
    let options = Options::create(&mut s, &OptionsConfig::default()).unwrap();
    assert!(matches!(
        options.atol(&mut s),
        Err(DiffeqError::MissingCapability { name: "Options_get_atol" })
    ));
    assert!(options.read(&mut s).is_err());
    options.destroy(&mut s).unwrap();
}

#[test]
fn test_signature_mismatch_is_reported() {
    let binary = wat_module(
        r#"(module
            (memory (export "memory") 1)
            (func (export "Vector_push") (param i32 i32)))"#,
    );
    let model = Sandbox::default().instantiate(&binary, None).unwrap();
    let gap = model
        .capability_report()
        .gaps()
        .iter()
        .find(|gap| gap.name == "Vector_push")
        .cloned()
        .unwrap();
    assert!(matches!(gap.kind, GapKind::SignatureMismatch(_)));
    assert!(!model.capability_report().is_bound("Vector_push"));
}

#[test]
fn test_strict_mode_rejects_incomplete_module() {
    let sandbox = Sandbox::new(SandboxConfig {
        require_complete_capabilities: true,
        ..SandboxConfig::default()
    });

    let err = sandbox.instantiate(&vector_only_module(), None).unwrap_err();
    match err {
        DiffeqError::ModuleLoad(message) => {
            assert!(message.contains("Options_create"));
            assert!(message.contains("Sundials_solve"));
            assert!(!message.contains("Options_get_"));
        }
        other => panic!("expected ModuleLoad, got {other:?}"),
    }

    assert!(sandbox
        .instantiate(&setter_only_module(Variant::CrossTerm), None)
        .is_ok());
}

fn wat_module(source: &str) -> Vec<u8> {
    wat::parse_str(source).unwrap()
}
