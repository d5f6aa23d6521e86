//! Python runtime initialization.
//!
//! # Usage
//!
//! Call [`initialize()`] once at startup, before constructing foreign-backed
//! estimators:
//!
//! ```rust,ignore
//! use lex_estimator::{Args, EcosystemConfig, ForeignEstimator};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     lex_estimator::initialize(EcosystemConfig::default())?;
//!
//!     let svc = ForeignEstimator::construct("sklearn.svm", "SVC", Args::new())?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! # Thread Safety
//!
//! [`initialize()`] may be called from several threads; the first successful
//! call installs the runtime and later calls return `Ok(())`. The interpreter
//! is attached on the designated foreign thread for every dispatched call.

use crate::config::EcosystemConfig;
use crate::error::EstimatorError;
use crate::foreign::{ForeignRuntime, ForeignValue};
use crate::python::conversion::{PyHandle, map_python_error};
use crate::runtime;
use pyo3::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

/// [`ForeignRuntime`] backed by the embedded Python interpreter.
#[derive(Debug, Clone)]
pub struct PythonRuntime {
    config: EcosystemConfig,
}

impl PythonRuntime {
    #[must_use]
    pub fn new(config: EcosystemConfig) -> Self {
        Self { config }
    }

    fn missing(&self, component: String) -> EstimatorError {
        EstimatorError::MissingBackend {
            component,
            instructions: self.config.install_url.clone(),
        }
    }
}

impl ForeignRuntime for PythonRuntime {
    fn config(&self) -> &EcosystemConfig {
        &self.config
    }

    fn import(&self, module: &str, symbol: &str) -> Result<ForeignValue, EstimatorError> {
        Python::attach(|py| {
            let imported = py.import(module).map_err(|err| {
                debug!("Import of {} failed: {}", module, map_python_error(py, &err));
                if py.import(self.config.root_module.as_str()).is_err() {
                    self.missing(self.config.name.clone())
                } else {
                    self.missing(module.to_string())
                }
            })?;

            let object = imported
                .getattr(symbol)
                .map_err(|_| self.missing(format!("{module}.{symbol}")))?;

            Ok(ForeignValue::new(PyHandle::new(&object)))
        })
    }
}

/// Start the interpreter, check that the ecosystem is importable and install
/// it as the process-wide runtime.
///
/// # Errors
///
/// - [`EstimatorError::MissingBackend`] if `config.root_module` cannot be
///   imported
/// - [`EstimatorError::InvalidConfig`] if `config` does not validate
#[must_use = "initialization may fail; check the Result"]
pub fn initialize(config: EcosystemConfig) -> Result<(), EstimatorError> {
    if runtime::is_installed() {
        return Ok(());
    }

    let config = config.into_builder().build()?;

    Python::initialize();
    Python::attach(|py| {
        py.import(config.root_module.as_str()).map_err(|err| {
            debug!("Probe of {} failed: {}", config.root_module, map_python_error(py, &err));
            EstimatorError::MissingBackend {
                component: config.name.clone(),
                instructions: config.install_url.clone(),
            }
        })?;
        info!("Python {} with {} available", py.version(), config.name);
        Ok::<(), EstimatorError>(())
    })?;

    match runtime::install(Arc::new(PythonRuntime::new(config))) {
        // Lost a race against another initializer.
        Err(EstimatorError::RuntimeInit(_)) if runtime::is_installed() => Ok(()),
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Args, Estimator, ForeignEstimator, Value};

    #[test]
    #[ignore = "Requires Python runtime with scikit-learn"]
    fn test_foreign_estimator_roundtrip() {
        initialize(EcosystemConfig::default()).unwrap();

        let mut clf = ForeignEstimator::construct(
            "sklearn.linear_model",
            "LogisticRegression",
            Args::new().kwarg("C", 10.0),
        )
        .unwrap();
        assert_eq!(clf.get_params(false).unwrap()["C"], Value::Float(10.0));

        clf.fit(
            &Args::new()
                .arg(vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]])
                .arg(vec![0, 0, 1, 1]),
        )
        .unwrap();
        assert_eq!(clf.classes().unwrap(), Some(Value::from(vec![0, 1])));

        let predictions = clf.predict(&Args::new().arg(vec![vec![0.0], vec![3.0]])).unwrap();
        assert!(matches!(predictions, Value::List(ref items) if items.len() == 2));
    }

    #[test]
    #[ignore = "Requires Python runtime with scikit-learn"]
    fn test_unknown_symbol_is_missing_backend() {
        initialize(EcosystemConfig::default()).unwrap();
        let err = runtime::import("sklearn.svm", "NoSuchClass").unwrap_err();
        assert!(matches!(err, EstimatorError::MissingBackend { .. }));
    }
}
