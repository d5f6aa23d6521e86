//! Error types for the lex-estimator crate.
//!
//! This module defines [`EstimatorError`], the error type returned by every
//! fallible operation of the protocol, and [`ForeignError`], the
//! backend-neutral carrier of an exception raised on the foreign side.
//!
//! # Error Handling
//!
//! Errors are designed to be:
//! - **Precise**: parameter errors name the failing path segment and the
//!   estimator that owns it, not just the full key
//! - **Actionable**: a missing backend names the missing component and where
//!   to find installation instructions
//! - **Transparent**: foreign exceptions are surfaced with their original type
//!   and message, never swallowed or rewritten
//!
//! # Example
//!
//! ```
//! use lex_estimator::{EstimatorError, ParamsMap};
//!
//! fn lookup(params: &ParamsMap, key: &str) -> Result<(), EstimatorError> {
//!     if !params.contains_key(key) {
//!         return Err(EstimatorError::invalid_parameter(key, "Pipeline"));
//!     }
//!     Ok(())
//! }
//!
//! let err = lookup(&ParamsMap::new(), "clf").unwrap_err();
//! assert!(err.to_string().contains("'clf'"));
//! ```

use thiserror::Error;

/// An exception raised by the foreign side during a dispatched call.
///
/// Carries the exception's type name and message exactly as reported by the
/// foreign runtime, so the original diagnostic survives the boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{exception}: {message}")]
pub struct ForeignError {
    /// Qualified type name of the foreign exception (e.g. `ValueError`).
    pub exception: String,
    /// The exception message.
    pub message: String,
}

impl ForeignError {
    /// Creates a foreign error from an exception type name and message.
    pub fn new(exception: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            exception: exception.into(),
            message: message.into(),
        }
    }

    /// Shorthand for the attribute-missing exception raised by most runtimes.
    pub fn attribute(name: &str) -> Self {
        Self::new("AttributeError", format!("object has no attribute '{name}'"))
    }
}

/// The main error type for lex-estimator operations.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EstimatorError {
    /// The foreign runtime, library, or a symbol in it is unavailable.
    ///
    /// Not retryable without user action: install the missing component.
    #[error(
        "{component} is not available. Install it and make sure it can be imported; \
         see {instructions} for installation instructions"
    )]
    MissingBackend {
        /// The component that could not be found (package, module or symbol).
        component: String,
        /// Where to find installation instructions.
        instructions: String,
    },

    /// A `set_params` path segment does not match any known parameter.
    #[error("Invalid parameter '{parameter}' for estimator {estimator}{}", reason_suffix(.reason))]
    InvalidParameter {
        /// The exact segment that failed to resolve.
        parameter: String,
        /// The estimator on which the segment was looked up.
        estimator: String,
        /// Why the segment does not resolve, when the name alone does not say.
        reason: Option<String>,
    },

    /// A declared parameter was given a value of the wrong kind.
    ///
    /// Raised by [`Estimator::set_param`](crate::Estimator::set_param) while
    /// pairs are applied, so earlier pairs of the same call may already be
    /// assigned.
    #[error("Invalid value for parameter '{parameter}' of estimator {estimator}: expected {expected}")]
    InvalidValue {
        /// The parameter being assigned.
        parameter: String,
        /// The estimator that declares it.
        estimator: String,
        /// The kind of value the parameter accepts.
        expected: String,
    },

    /// A cycle was found while traversing nested parameters.
    ///
    /// Parameter trees must be acyclic; this is reported instead of
    /// recursing forever.
    #[error("Cyclic parameter graph: estimator reached again through '{path}'")]
    CyclicParameterGraph {
        /// The dotted parameter path that led back to an ancestor.
        path: String,
    },

    /// An error raised by the foreign side during a dispatched operation.
    #[error(transparent)]
    ForeignCall(#[from] ForeignError),

    /// An operation name that is not part of the dispatch table.
    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),

    /// The estimator does not implement the requested capability.
    #[error("Estimator {estimator} does not support '{operation}'")]
    Unsupported {
        /// Native spelling of the operation.
        operation: String,
        /// The estimator the operation was invoked on.
        estimator: String,
    },

    /// A foreign module whose functionality is provided natively was imported.
    #[error("The foreign module '{module}' is not available here; use the native {replacement} instead")]
    NativeModule {
        /// The requested foreign module.
        module: String,
        /// The native replacement.
        replacement: String,
    },

    /// Invalid ecosystem configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A value could not be converted across the foreign boundary.
    #[error("Cannot marshal value: {0}")]
    Marshal(String),

    /// Failed to initialize or register the foreign runtime.
    #[error("Runtime initialization failed: {0}")]
    RuntimeInit(String),

    /// The designated foreign thread is gone or a job on it panicked.
    #[error("Foreign thread error: {0}")]
    ForeignThread(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason.as_ref().map(|reason| format!(": {reason}")).unwrap_or_default()
}

impl EstimatorError {
    /// Builds an [`InvalidParameter`](Self::InvalidParameter) error for an
    /// unknown name.
    pub fn invalid_parameter(parameter: impl Into<String>, estimator: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            estimator: estimator.into(),
            reason: None,
        }
    }

    /// Builds an [`InvalidValue`](Self::InvalidValue) error.
    pub fn invalid_value(
        parameter: impl Into<String>,
        estimator: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            parameter: parameter.into(),
            estimator: estimator.into(),
            expected: expected.into(),
        }
    }

    /// Builds an [`Unsupported`](Self::Unsupported) error.
    pub fn unsupported(operation: impl Into<String>, estimator: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            estimator: estimator.into(),
        }
    }

    /// Returns the foreign exception if this error came from the foreign side.
    #[must_use]
    pub fn foreign(&self) -> Option<&ForeignError> {
        match self {
            Self::ForeignCall(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for EstimatorError {
    fn from(err: pyo3::PyErr) -> Self {
        pyo3::Python::attach(|py| crate::python::conversion::map_python_error(py, &err)).into()
    }
}
