//! Tests for host configuration.

use super::*;
use diffeq_core::{Jacobian, LinearSolver};

#[test]
fn test_toml_parsing() {
    let toml = r#"
        [compiler]
        base_url = "http://127.0.0.1:9000/"
        model_name = "logistic"

        [sandbox]
        stdout_capacity = 4096
        require_complete_capabilities = true

        [options]
        linear_solver = "spgmr"
        jacobian = "numerical"
        atol = 1e-9
    "#;

    let config = HostConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.compiler.compile_url(), "http://127.0.0.1:9000/compile");
    assert_eq!(config.compiler.model_name, "logistic");
    assert_eq!(config.compiler.timeout(), None);
    assert_eq!(config.sandbox.stdout_capacity, 4096);
    assert_eq!(config.sandbox.stderr_capacity, DEFAULT_STREAM_CAPACITY);
    assert!(config.sandbox.require_complete_capabilities);
    assert_eq!(config.options.linear_solver, LinearSolver::Spgmr);
    assert_eq!(config.options.jacobian, Jacobian::Numerical);
    assert_eq!(config.options.atol, 1e-9);
    assert_eq!(config.options.mxsteps, 500);
}

#[test]
fn test_yaml_parsing() {
    let yaml = r#"
        compiler:
          timeout_secs: 10
        options:
          mxsteps: 250
          fwd_sens: true
    "#;

    let config = HostConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.compiler.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.compiler.timeout(), Some(Duration::from_secs(10)));
    assert_eq!(config.options.mxsteps, 250);
    assert!(config.options.fwd_sens);
}

#[test]
fn test_empty_document_is_default() {
    let config = HostConfig::from_toml_str("").unwrap();
    assert_eq!(config.compiler.model_name, DEFAULT_MODEL_NAME);
    assert!(!config.sandbox.require_complete_capabilities);
    assert_eq!(config.options, OptionsConfig::default());
}

#[test]
fn test_validation() {
    let err = HostConfig::from_toml_str(
        r#"
        [sandbox]
        stderr_capacity = 0
    "#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = HostConfig::from_toml_str(
        r#"
        [options]
        min_step = 2.0
        max_step = 1.0
    "#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("min_step"));
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        HostConfig::load("/nonexistent/diffeq.toml"),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn test_builder() {
    let config = HostConfig::new()
        .with_base_url("http://localhost:1234")
        .with_complete_capabilities(true)
        .with_options(OptionsConfig::new().with_mxsteps(42));

    assert_eq!(config.compiler.compile_url(), "http://localhost:1234/compile");
    assert!(config.sandbox.require_complete_capabilities);
    assert_eq!(config.options.mxsteps, 42);
}
