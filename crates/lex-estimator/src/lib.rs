//! lex-estimator: a uniform estimator protocol for native and foreign models.
//!
//! Estimators expose one capability set (`fit`, `predict`, `transform`,
//! `score`, parameter introspection and mutation, ...) whether they are
//! implemented in Rust or serviced by an object living in a foreign runtime
//! such as Python's scikit-learn. Calling code cannot tell the two apart.
//!
//! # Features
//!
//! - **Composite parameters**: estimators nest other estimators as
//!   parameters; nested parameters are read and written through
//!   `name__subname` paths ([`params`])
//! - **Cross-boundary dispatch**: operations on foreign-backed estimators are
//!   translated to the foreign method names and their results normalized
//!   into native values ([`dispatch`], [`normalize()`])
//! - **Single foreign thread**: every foreign call runs on one designated
//!   thread; calls from other threads are marshaled onto it
//! - **Actionable errors**: missing backends name the missing component and
//!   where to install it; invalid paths name the failing segment
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_estimator::{Args, EcosystemConfig, Estimator, ForeignEstimator};
//!
//! // Install the Python backend (feature `python`) once at startup
//! lex_estimator::initialize(EcosystemConfig::default())?;
//!
//! let clf = ForeignEstimator::construct("sklearn.svm", "SVC", Args::new())?.into_ref();
//! let mut pipeline = MyPipeline::new(vec![("scaler", scaler), ("clf", clf)]);
//!
//! lex_estimator::set_params(&mut pipeline, [("clf__C", 10.0)])?;
//! pipeline.fit(&Args::new().arg(x).arg(y))?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Native estimators              ForeignEstimator             │
//! │  (impl Estimator)               (impl Estimator)             │
//! │        │                               │                     │
//! │        ▼                               ▼                     │
//! │  params: get_params / set_params ──► dispatch ──► normalize  │
//! └────────────────────────────────────────┬─────────────────────┘
//!                                          │ ForeignThread
//!                                          ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ForeignRuntime: PythonRuntime (PyO3) or testing::MockRuntime│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, EstimatorError>`]:
//!
//! - [`EstimatorError::MissingBackend`] - foreign runtime, library or symbol unavailable
//! - [`EstimatorError::InvalidParameter`] - a parameter path does not resolve
//! - [`EstimatorError::CyclicParameterGraph`] - an estimator is its own descendant
//! - [`EstimatorError::ForeignCall`] - the foreign side raised; original type and message kept
//!
//! # Thread Safety
//!
//! Estimators are not locked internally. Share them through [`EstimatorRef`]
//! and hold its lock while mutating.

mod config;
pub mod dispatch;
mod error;
mod estimator;
mod foreign;
mod normalize;
mod operation;
pub mod params;
#[cfg(feature = "python")]
pub mod python;
pub mod runtime;
pub mod testing;
mod thread;
mod value;

// Re-export public API
//
// Configuration
pub use config::{EcosystemConfig, EcosystemConfigBuilder};
// Errors
pub use error::{EstimatorError, ForeignError};
// Estimator capability set and uniform operations
pub use estimator::{
    Estimator, EstimatorRef, clone, fit_transform, get_classes, get_components, get_params,
    invoke, is_classifier, is_pairwise, set_params,
};
// Foreign boundary
pub use foreign::{ForeignEstimator, ForeignObject, ForeignRuntime, ForeignValue};
pub use normalize::normalize;
pub use operation::Operation;
pub use thread::ForeignThread;
// Values
pub use value::{Args, Kwargs, Params, ParamsMap, Value};

/// Initialize the Python backend and install it as the process-wide runtime.
///
/// Idempotent: returns `Ok(())` once a runtime is installed.
///
/// # Errors
///
/// [`EstimatorError::MissingBackend`] if the ecosystem's root module cannot
/// be imported; [`EstimatorError::InvalidConfig`] for an invalid `config`.
#[cfg(feature = "python")]
#[must_use = "initialization errors should be handled"]
pub fn initialize(config: EcosystemConfig) -> Result<(), EstimatorError> {
    python::runtime::initialize(config)
}

/// Whether a foreign runtime has been installed.
#[must_use = "the initialization status should be checked"]
pub fn is_initialized() -> bool {
    runtime::is_installed()
}
