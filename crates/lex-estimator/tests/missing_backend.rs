//! Integration tests for a process without a foreign runtime.
//!
//! Kept in its own test binary: nothing here may install a runtime, since
//! installation is process-wide and permanent.

mod common;

use common::scaler_and_classifier;
use lex_estimator::testing::MockArray;
use lex_estimator::{Args, Estimator, EstimatorError, ForeignValue, Operation, Value, dispatch, runtime};

// ============================================================================
// Helper Functions
// ============================================================================

fn assert_missing_backend(err: EstimatorError) {
    let message = err.to_string();
    assert!(
        matches!(err, EstimatorError::MissingBackend { ref component, .. } if component == "scikit-learn"),
        "Expected MissingBackend for scikit-learn, got: {message}"
    );
    assert!(message.contains("scikit-learn is not available"));
    assert!(message.contains("https://scikit-learn.org/stable/install.html"));
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_nothing_is_installed() {
    assert!(!lex_estimator::is_initialized());
    assert_eq!(runtime::foreign_thread_id(), None);
}

#[test]
fn test_construct_names_missing_ecosystem() {
    let err = lex_estimator::ForeignEstimator::construct("sklearn.svm", "SVC", Args::new())
        .unwrap_err();
    assert_missing_backend(err);
}

#[test]
fn test_import_names_missing_ecosystem() {
    assert_missing_backend(runtime::import("sklearn.linear_model", "Ridge").unwrap_err());
}

#[test]
fn test_dispatch_names_missing_ecosystem() {
    let object = ForeignValue::new(MockArray::vector(vec![Value::Int(1)]));

    assert_missing_backend(dispatch::invoke(&object, Operation::Predict, Args::new()).unwrap_err());
    assert_missing_backend(dispatch::get_params(&object, true).unwrap_err());
    assert_missing_backend(dispatch::clone(&object).unwrap_err());
    assert_missing_backend(runtime::config().unwrap_err());
}

#[test]
fn test_native_estimators_work_without_a_runtime() {
    let (mut pipeline, _, clf) = scaler_and_classifier();

    lex_estimator::set_params(&mut pipeline, [("clf__C", 4.0)]).unwrap();
    assert_eq!(clf.lock().get_param("C"), Some(Value::Float(4.0)));

    pipeline
        .fit(&Args::new().arg(vec![-1.0, 1.0]).arg(vec![0, 1]))
        .unwrap();
    let copy = lex_estimator::clone(&pipeline).unwrap();
    assert_eq!(copy.lock().get_params(true).unwrap()["clf__C"], Value::Float(4.0));
}
