//! Tests for the options record.

use crate::error::DiffeqError;
use crate::options::{Jacobian, LinearSolver, OptionsConfig, Preconditioner};

#[test]
fn test_defaults() {
    let options = OptionsConfig::default();
    assert!(!options.fixed_times);
    assert!(!options.print_stats);
    assert!(!options.fwd_sens);
    assert_eq!(options.atol, 1e-6);
    assert_eq!(options.rtol, 1e-6);
    assert_eq!(options.linear_solver, LinearSolver::Dense);
    assert_eq!(options.preconditioner, Preconditioner::None);
    assert_eq!(options.jacobian, Jacobian::Dense);
    assert_eq!(options.linsol_max_iterations, 100);
    assert!(!options.debug);
    assert_eq!(options.mxsteps, 500);
    assert_eq!(options.min_step, 0.0);
    assert_eq!(options.max_step, f64::MAX);
}

#[test]
fn test_module_codes() {
    assert_eq!(LinearSolver::Dense.code(), 0);
    assert_eq!(LinearSolver::Klu.code(), 1);
    assert_eq!(LinearSolver::Sptfqmr.code(), 5);
    assert_eq!(Preconditioner::Both.code(), 3);
    assert_eq!(Jacobian::Numerical.code(), 2);

    for solver in [
        LinearSolver::Dense,
        LinearSolver::Klu,
        LinearSolver::Spbcgs,
        LinearSolver::Spfgmr,
        LinearSolver::Spgmr,
        LinearSolver::Sptfqmr,
    ] {
        assert_eq!(LinearSolver::try_from(solver.code()).unwrap(), solver);
    }
}

#[test]
fn test_unknown_code_is_rejected() {
    let err = LinearSolver::try_from(6).unwrap_err();
    match err {
        DiffeqError::InvalidOptionValue { option, value } => {
            assert_eq!(option, "linear_solver");
            assert_eq!(value, 6);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(Preconditioner::try_from(-1).is_err());
    assert!(Jacobian::try_from(3).is_err());
}

#[test]
fn test_partial_toml() {
    let options: OptionsConfig = toml::from_str(
        r#"
        linear_solver = "klu"
        preconditioner = "left"
        mxsteps = 2000
        fixed_times = true
    "#,
    )
    .unwrap();

    assert_eq!(options.linear_solver, LinearSolver::Klu);
    assert_eq!(options.preconditioner, Preconditioner::Left);
    assert_eq!(options.mxsteps, 2000);
    assert!(options.fixed_times);
    assert_eq!(options.jacobian, Jacobian::Dense);
    assert_eq!(options.max_step, f64::MAX);
}

#[test]
fn test_builder() {
    let options = OptionsConfig::new()
        .with_tolerances(1e-8, 1e-4)
        .with_jacobian(Jacobian::Sparse)
        .with_step_bounds(1e-3, 0.5)
        .with_debug(true);

    assert_eq!(options.atol, 1e-8);
    assert_eq!(options.rtol, 1e-4);
    assert_eq!(options.jacobian, Jacobian::Sparse);
    assert_eq!(options.min_step, 1e-3);
    assert_eq!(options.max_step, 0.5);
    assert!(options.debug);
}
