//! In-memory foreign ecosystem for tests.
//!
//! [`MockRuntime`] implements [`ForeignRuntime`] without any foreign
//! interpreter. It imitates a small scikit-learn: `sklearn.base.clone`,
//! `sklearn.base.is_classifier` and a handful of estimator classes whose
//! instances ([`MockEstimator`]) keep parameters, learn trivial state in
//! `fit`, return [`MockArray`]s, and raise exceptions with the same type
//! names the real library uses.
//!
//! Every mock estimator records its method calls and the thread they ran on,
//! so tests can check that dispatch happens on the designated thread and
//! that no foreign call is made where none is expected.
//!
//! # Usage
//!
//! ```
//! use lex_estimator::testing;
//! use lex_estimator::{Args, Estimator, ForeignEstimator, Value};
//!
//! testing::install();
//!
//! let mut clf = ForeignEstimator::construct(
//!     "sklearn.linear_model",
//!     "LogisticRegression",
//!     Args::new().kwarg("C", 10.0),
//! )
//! .unwrap();
//! clf.fit(&Args::new().arg(vec![1.0, 2.0, 3.0]).arg(vec![0, 1, 1])).unwrap();
//!
//! assert_eq!(clf.classes().unwrap(), Some(Value::from(vec![0, 1])));
//! ```
//!
//! | Module | Symbols |
//! |--------|---------|
//! | `sklearn.base` | `clone`, `is_classifier` |
//! | `sklearn.linear_model` | `LogisticRegression`, `Ridge` |
//! | `sklearn.preprocessing` | `StandardScaler` |
//! | `sklearn.decomposition` | `PCA` |
//! | `sklearn.svm` | `SVC` |
//! | `sklearn.ensemble` | `BaggingClassifier` |

use crate::config::EcosystemConfig;
use crate::error::{EstimatorError, ForeignError};
use crate::foreign::{ForeignObject, ForeignRuntime, ForeignValue};
use crate::params::DELIMITER;
use crate::runtime;
use crate::value::{Kwargs, ParamsMap, Value};
use parking_lot::Mutex;
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Install a [`MockRuntime`] as the process-wide runtime, unless a runtime
/// is already installed. Safe to call from every test.
pub fn install() {
    if !runtime::is_installed() {
        // Another test may win the race; either way a runtime is installed.
        let _ = runtime::install(Arc::new(MockRuntime::new()));
    }
}

// =============================================================================
// Runtime
// =============================================================================

/// A [`ForeignRuntime`] backed by in-memory objects.
#[derive(Debug, Clone, Default)]
pub struct MockRuntime {
    config: EcosystemConfig,
}

impl MockRuntime {
    /// Runtime with the default (scikit-learn) configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime serving the module names of `config`.
    #[must_use]
    pub fn with_config(config: EcosystemConfig) -> Self {
        Self { config }
    }

    fn missing(&self, component: String) -> EstimatorError {
        EstimatorError::MissingBackend {
            component,
            instructions: self.config.install_url.clone(),
        }
    }
}

impl ForeignRuntime for MockRuntime {
    fn config(&self) -> &EcosystemConfig {
        &self.config
    }

    fn import(&self, module: &str, symbol: &str) -> Result<ForeignValue, EstimatorError> {
        if module == self.config.base_module {
            return match symbol {
                "clone" => Ok(ForeignValue::new(MockFunction::new("clone", base_clone))),
                "is_classifier" => Ok(ForeignValue::new(MockFunction::new(
                    "is_classifier",
                    base_is_classifier,
                ))),
                _ => Err(self.missing(format!("{module}.{symbol}"))),
            };
        }

        let submodule = module
            .strip_prefix(self.config.root_module.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .filter(|sub| MockKind::ALL.iter().any(|kind| kind.module() == *sub))
            .ok_or_else(|| self.missing(module.to_string()))?;

        MockKind::ALL
            .iter()
            .find(|kind| kind.module() == submodule && kind.name() == symbol)
            .map(|kind| ForeignValue::new(MockClass { kind: *kind }))
            .ok_or_else(|| self.missing(format!("{module}.{symbol}")))
    }
}

fn base_clone(args: &[Value], kwargs: &Kwargs) -> Result<Value, ForeignError> {
    let object = args.first().ok_or_else(|| {
        ForeignError::new(
            "TypeError",
            "clone() missing 1 required positional argument: 'estimator'",
        )
    })?;
    let safe = kwargs.get("safe").and_then(Value::as_bool).unwrap_or(true);

    match object.as_foreign().and_then(|obj| obj.downcast_ref::<MockEstimator>()) {
        Some(estimator) => Ok(Value::Foreign(ForeignValue::new(estimator.clone_unfitted()))),
        None if safe => Err(ForeignError::new(
            "TypeError",
            format!(
                "Cannot clone object '{object}': it does not seem to be a scikit-learn \
                 estimator as it does not implement a 'get_params' method."
            ),
        )),
        None => Ok(object.clone()),
    }
}

fn base_is_classifier(args: &[Value], _kwargs: &Kwargs) -> Result<Value, ForeignError> {
    let is_classifier = args
        .first()
        .and_then(Value::as_foreign)
        .and_then(|obj| obj.downcast_ref::<MockEstimator>())
        .is_some_and(|estimator| estimator.kind.is_classifier());
    Ok(Value::Bool(is_classifier))
}

// =============================================================================
// Functions and arrays
// =============================================================================

type MockFn = dyn Fn(&[Value], &Kwargs) -> Result<Value, ForeignError> + Send + Sync;

/// A callable foreign function.
pub struct MockFunction {
    name: String,
    body: Arc<MockFn>,
}

impl MockFunction {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value], &Kwargs) -> Result<Value, ForeignError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Arc::new(body),
        }
    }
}

impl fmt::Debug for MockFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

impl ForeignObject for MockFunction {
    fn type_name(&self) -> String {
        "function".to_string()
    }

    fn call(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value, ForeignError> {
        (self.body)(args, kwargs)
    }

    fn call_method(&self, method: &str, _: &[Value], _: &Kwargs) -> Result<Value, ForeignError> {
        Err(no_attribute("function", method))
    }

    fn getattr(&self, name: &str) -> Result<Option<Value>, ForeignError> {
        Ok((name == "__name__").then(|| Value::Str(self.name.clone())))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A foreign array of rank 1 or 2.
///
/// Rank-2 arrays store their rows as [`Value::List`] items.
#[derive(Debug, Clone, PartialEq)]
pub struct MockArray {
    items: Vec<Value>,
    ndim: usize,
    fail_copy: bool,
}

impl MockArray {
    /// A rank-1 array.
    #[must_use]
    pub fn vector(items: Vec<Value>) -> Self {
        Self {
            items,
            ndim: 1,
            fail_copy: false,
        }
    }

    /// A rank-2 array.
    #[must_use]
    pub fn matrix(rows: Vec<Vec<f64>>) -> Self {
        Self::from_rows(rows.into_iter().map(Value::from).collect())
    }

    fn from_rows(rows: Vec<Value>) -> Self {
        Self {
            items: rows,
            ndim: 2,
            fail_copy: false,
        }
    }

    /// Make element-wise copies fail, as for an unreadable buffer.
    #[must_use]
    pub fn failing_copy(mut self) -> Self {
        self.fail_copy = true;
        self
    }

    /// Elements (rank 1) or rows (rank 2).
    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.items
    }
}

impl ForeignObject for MockArray {
    fn type_name(&self) -> String {
        "ndarray".to_string()
    }

    fn call(&self, _: &[Value], _: &Kwargs) -> Result<Value, ForeignError> {
        Err(ForeignError::new("TypeError", "'numpy.ndarray' object is not callable"))
    }

    fn call_method(&self, method: &str, _: &[Value], _: &Kwargs) -> Result<Value, ForeignError> {
        match method {
            "tolist" => Ok(Value::List(self.items.clone())),
            _ => Err(no_attribute("numpy.ndarray", method)),
        }
    }

    fn getattr(&self, name: &str) -> Result<Option<Value>, ForeignError> {
        Ok(match name {
            "ndim" => Some(Value::Int(self.ndim as i64)),
            "size" => Some(Value::Int(self.items.len() as i64)),
            _ => None,
        })
    }

    fn ndim(&self) -> Option<usize> {
        Some(self.ndim)
    }

    fn to_vec(&self) -> Result<Vec<Value>, ForeignError> {
        if self.fail_copy {
            return Err(ForeignError::new("BufferError", "buffer is not readable"));
        }
        if self.ndim != 1 {
            return Err(ForeignError::new(
                "ValueError",
                format!("expected a 1-dimensional array, got {} dimensions", self.ndim),
            ));
        }
        Ok(self.items.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn array(items: Vec<Value>) -> Value {
    Value::Foreign(ForeignValue::new(MockArray::vector(items)))
}

fn table(rows: Vec<Value>) -> Value {
    Value::Foreign(ForeignValue::new(MockArray::from_rows(rows)))
}

/// Samples of an array-like argument: a list, or the items of a mock array.
fn samples(value: Option<&Value>, what: &str, method: &str) -> Result<Vec<Value>, ForeignError> {
    match value {
        Some(Value::List(items)) => Ok(items.clone()),
        Some(Value::Foreign(obj)) => obj
            .downcast_ref::<MockArray>()
            .map(|array| array.items().to_vec())
            .ok_or_else(|| {
                ForeignError::new(
                    "TypeError",
                    format!("Expected array-like {what}, got {}", obj.type_name()),
                )
            }),
        Some(other) => Err(ForeignError::new(
            "TypeError",
            format!("Expected array-like {what}, got {}", other.kind()),
        )),
        None => Err(ForeignError::new(
            "TypeError",
            format!("{method}() missing 1 required positional argument: '{what}'"),
        )),
    }
}

fn features(sample: &Value) -> Vec<f64> {
    match sample {
        Value::List(row) => row.iter().filter_map(Value::as_f64).collect(),
        other => other.as_f64().into_iter().collect(),
    }
}

fn no_attribute(type_name: &str, name: &str) -> ForeignError {
    ForeignError::new(
        "AttributeError",
        format!("'{type_name}' object has no attribute '{name}'"),
    )
}

// =============================================================================
// Estimator classes
// =============================================================================

/// The estimator classes served by [`MockRuntime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockKind {
    LogisticRegression,
    Ridge,
    StandardScaler,
    Pca,
    Svc,
    BaggingClassifier,
}

impl MockKind {
    pub const ALL: [MockKind; 6] = [
        MockKind::LogisticRegression,
        MockKind::Ridge,
        MockKind::StandardScaler,
        MockKind::Pca,
        MockKind::Svc,
        MockKind::BaggingClassifier,
    ];

    /// Class name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            MockKind::LogisticRegression => "LogisticRegression",
            MockKind::Ridge => "Ridge",
            MockKind::StandardScaler => "StandardScaler",
            MockKind::Pca => "PCA",
            MockKind::Svc => "SVC",
            MockKind::BaggingClassifier => "BaggingClassifier",
        }
    }

    /// Submodule of the root module holding the class.
    #[must_use]
    pub fn module(self) -> &'static str {
        match self {
            MockKind::LogisticRegression | MockKind::Ridge => "linear_model",
            MockKind::StandardScaler => "preprocessing",
            MockKind::Pca => "decomposition",
            MockKind::Svc => "svm",
            MockKind::BaggingClassifier => "ensemble",
        }
    }

    #[must_use]
    pub fn is_classifier(self) -> bool {
        matches!(
            self,
            MockKind::LogisticRegression | MockKind::Svc | MockKind::BaggingClassifier
        )
    }

    fn is_transformer(self) -> bool {
        matches!(self, MockKind::StandardScaler | MockKind::Pca)
    }

    fn defaults(self) -> Vec<(&'static str, Value)> {
        match self {
            MockKind::LogisticRegression => vec![
                ("C", Value::Float(1.0)),
                ("max_iter", Value::Int(100)),
                ("penalty", Value::from("l2")),
            ],
            MockKind::Ridge => vec![("alpha", Value::Float(1.0))],
            MockKind::StandardScaler => vec![
                ("with_mean", Value::Bool(true)),
                ("with_std", Value::Bool(true)),
            ],
            MockKind::Pca => vec![("n_components", Value::Int(2))],
            MockKind::Svc => vec![("C", Value::Float(1.0)), ("kernel", Value::from("rbf"))],
            MockKind::BaggingClassifier => {
                vec![("estimator", Value::None), ("n_estimators", Value::Int(10))]
            }
        }
    }

    fn supports(self, method: &str) -> bool {
        match method {
            "get_params" | "set_params" | "fit" => true,
            "fit_transform" | "transform" | "inverse_transform" => self.is_transformer(),
            "predict" | "score" => !self.is_transformer(),
            "predict_proba" | "predict_log_proba" => matches!(
                self,
                MockKind::LogisticRegression | MockKind::BaggingClassifier
            ),
            "decision_function" => matches!(self, MockKind::LogisticRegression | MockKind::Svc),
            "partial_fit" => self == MockKind::Ridge,
            _ => false,
        }
    }
}

/// A foreign class; calling it constructs a [`MockEstimator`].
#[derive(Debug, Clone, Copy)]
pub struct MockClass {
    kind: MockKind,
}

impl ForeignObject for MockClass {
    fn type_name(&self) -> String {
        "type".to_string()
    }

    fn call(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value, ForeignError> {
        if !args.is_empty() {
            return Err(ForeignError::new(
                "TypeError",
                format!(
                    "{}.__init__() takes 1 positional argument but {} were given",
                    self.kind.name(),
                    args.len() + 1
                ),
            ));
        }
        let estimator = MockEstimator::new(self.kind, kwargs.clone())?;
        Ok(Value::Foreign(ForeignValue::new(estimator)))
    }

    fn call_method(&self, method: &str, _: &[Value], _: &Kwargs) -> Result<Value, ForeignError> {
        Err(no_attribute("type", method))
    }

    fn getattr(&self, name: &str) -> Result<Option<Value>, ForeignError> {
        Ok((name == "__name__").then(|| Value::from(self.kind.name())))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A method call received by a [`MockEstimator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// Foreign method name.
    pub method: String,
    /// Thread the call ran on.
    pub thread: ThreadId,
}

#[derive(Debug, Clone)]
struct Fitted {
    classes: Vec<Value>,
    n_features: usize,
}

#[derive(Debug, Clone)]
struct MockState {
    params: ParamsMap,
    fitted: Option<Fitted>,
}

/// An instance of one of the [`MockKind`] classes.
///
/// `set_params` returns `None` rather than the instance itself.
#[derive(Debug)]
pub struct MockEstimator {
    kind: MockKind,
    state: Mutex<MockState>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockEstimator {
    /// Construct with default parameters overridden by `params`.
    ///
    /// # Errors
    ///
    /// `TypeError` for a parameter the class does not declare.
    pub fn new(kind: MockKind, params: Kwargs) -> Result<Self, ForeignError> {
        let mut all: ParamsMap = kind
            .defaults()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();

        for (name, value) in params {
            if !all.contains_key(&name) {
                return Err(ForeignError::new(
                    "TypeError",
                    format!(
                        "{}.__init__() got an unexpected keyword argument '{name}'",
                        kind.name()
                    ),
                ));
            }
            all.insert(name, value);
        }

        Ok(Self::with_params(kind, all))
    }

    fn with_params(kind: MockKind, params: ParamsMap) -> Self {
        Self {
            kind,
            state: Mutex::new(MockState {
                params,
                fitted: None,
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> MockKind {
        self.kind
    }

    /// Method calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Names of the methods called so far, in order.
    #[must_use]
    pub fn call_names(&self) -> Vec<String> {
        self.calls.lock().iter().map(|call| call.method.clone()).collect()
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.state.lock().fitted.is_some()
    }

    /// Current value of a parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<Value> {
        self.state.lock().params.get(name).cloned()
    }

    fn nested(value: &Value) -> Option<&MockEstimator> {
        value.as_foreign()?.downcast_ref::<MockEstimator>()
    }

    /// Same parameters, nested estimators cloned too, nothing learned.
    fn clone_unfitted(&self) -> MockEstimator {
        let params = self.state.lock().params.clone();
        let params = params
            .into_iter()
            .map(|(name, value)| {
                let copy = Self::nested(&value)
                    .map(|sub| Value::Foreign(ForeignValue::new(sub.clone_unfitted())));
                (name, copy.unwrap_or(value))
            })
            .collect();
        Self::with_params(self.kind, params)
    }

    fn get_params(&self, deep: bool) -> ParamsMap {
        let mut params = self.state.lock().params.clone();
        if deep {
            let nested: Vec<(String, Value)> = params
                .iter()
                .filter_map(|(name, value)| Some((name, Self::nested(value)?)))
                .flat_map(|(name, sub)| {
                    sub.get_params(true)
                        .into_iter()
                        .map(move |(key, value)| (format!("{name}{DELIMITER}{key}"), value))
                })
                .collect();
            params.extend(nested);
        }
        params
    }

    fn set_params(&self, kwargs: &Kwargs) -> Result<(), ForeignError> {
        let own = self.state.lock().params.clone();

        for key in kwargs.keys() {
            let name = key.split_once(DELIMITER).map_or(key.as_str(), |(name, _)| name);
            if !own.contains_key(name) {
                return Err(ForeignError::new(
                    "ValueError",
                    format!(
                        "Invalid parameter '{name}' for estimator {}(). \
                         Valid parameters are: {:?}.",
                        self.kind.name(),
                        own.keys().collect::<Vec<_>>()
                    ),
                ));
            }
        }

        for (key, value) in kwargs {
            match key.split_once(DELIMITER) {
                None => {
                    self.state.lock().params.insert(key.clone(), value.clone());
                }
                Some((name, rest)) => {
                    let current = self.param(name).unwrap_or_default();
                    let sub = Self::nested(&current).ok_or_else(|| {
                        ForeignError::new(
                            "ValueError",
                            format!("Invalid parameter '{rest}' for estimator {current}."),
                        )
                    })?;
                    let nested = Kwargs::from([(rest.to_string(), value.clone())]);
                    sub.set_params(&nested)?;
                }
            }
        }

        Ok(())
    }

    fn check_fitted(&self) -> Result<Fitted, ForeignError> {
        self.state.lock().fitted.clone().ok_or_else(|| {
            ForeignError::new(
                "NotFittedError",
                format!(
                    "This {} instance is not fitted yet. Call 'fit' with appropriate \
                     arguments before using this estimator.",
                    self.kind.name()
                ),
            )
        })
    }

    fn fit(&self, args: &[Value]) -> Result<(), ForeignError> {
        let x = samples(args.first(), "X", "fit")?;

        if self.kind == MockKind::LogisticRegression
            && let Some(c) = self.param("C")
            && c.as_f64().is_some_and(|c| c <= 0.0)
        {
            return Err(ForeignError::new(
                "ValueError",
                format!("Penalty term must be positive; got (C={c})"),
            ));
        }

        let mut classes = Vec::new();
        if self.kind.is_classifier() {
            for label in samples(args.get(1), "y", "fit")? {
                if !classes.contains(&label) {
                    classes.push(label);
                }
            }
            classes.sort_by(compare_labels);
        }

        let n_features = x.first().map_or(0, |sample| features(sample).len());
        self.state.lock().fitted = Some(Fitted {
            classes,
            n_features,
        });
        Ok(())
    }

    fn predict(&self, args: &[Value]) -> Result<Value, ForeignError> {
        let fitted = self.check_fitted()?;
        let x = samples(args.first(), "X", "predict")?;

        let predictions = if self.kind.is_classifier() {
            (0..x.len())
                .map(|i| fitted.classes[i % fitted.classes.len().max(1)].clone())
                .collect()
        } else {
            x.iter()
                .map(|sample| Value::Float(features(sample).iter().sum()))
                .collect()
        };
        Ok(array(predictions))
    }

    fn predict_proba(&self, args: &[Value]) -> Result<Value, ForeignError> {
        let fitted = self.check_fitted()?;
        let x = samples(args.first(), "X", "predict_proba")?;
        let k = fitted.classes.len().max(1);
        let row = Value::from(vec![1.0 / k as f64; k]);
        Ok(table(vec![row; x.len()]))
    }

    fn transform(&self, args: &[Value]) -> Result<Value, ForeignError> {
        let fitted = self.check_fitted()?;
        let x = samples(args.first(), "X", "transform")?;

        let keep = match self.kind {
            MockKind::Pca => self
                .param("n_components")
                .and_then(|n| n.as_i64())
                .map_or(fitted.n_features, |n| n.max(0) as usize),
            _ => fitted.n_features,
        };
        let rows = x
            .iter()
            .map(|sample| Value::from(features(sample).into_iter().take(keep).collect::<Vec<_>>()))
            .collect();
        Ok(table(rows))
    }

    fn score(&self, args: &[Value]) -> Result<Value, ForeignError> {
        let predicted = match self.predict(args)? {
            Value::Foreign(obj) => obj
                .downcast_ref::<MockArray>()
                .map(|array| array.items().to_vec())
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        let y = samples(args.get(1), "y", "score")?;
        if y.is_empty() {
            return Ok(Value::Float(0.0));
        }
        let hits = predicted.iter().zip(&y).filter(|(p, t)| p == t).count();
        Ok(Value::Float(hits as f64 / y.len() as f64))
    }
}

fn compare_labels(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

impl ForeignObject for MockEstimator {
    fn type_name(&self) -> String {
        self.kind.name().to_string()
    }

    fn call(&self, _: &[Value], _: &Kwargs) -> Result<Value, ForeignError> {
        Err(ForeignError::new(
            "TypeError",
            format!("'{}' object is not callable", self.kind.name()),
        ))
    }

    fn call_method(&self, method: &str, args: &[Value], kwargs: &Kwargs) -> Result<Value, ForeignError> {
        self.calls.lock().push(MockCall {
            method: method.to_string(),
            thread: thread::current().id(),
        });

        if !self.kind.supports(method) {
            return Err(no_attribute(self.kind.name(), method));
        }

        match method {
            "get_params" => {
                let deep = kwargs.get("deep").and_then(Value::as_bool).unwrap_or(true);
                Ok(Value::Map(self.get_params(deep)))
            }
            "set_params" => self.set_params(kwargs).map(|()| Value::None),
            "fit" | "partial_fit" => self.fit(args).map(|()| Value::None),
            "fit_transform" => {
                self.fit(args)?;
                self.transform(args)
            }
            "predict" => self.predict(args),
            "predict_proba" => self.predict_proba(args),
            "predict_log_proba" => {
                let fitted = self.check_fitted()?;
                let x = samples(args.first(), "X", "predict_log_proba")?;
                let k = fitted.classes.len().max(1);
                let row = Value::from(vec![-(k as f64).ln(); k]);
                Ok(table(vec![row; x.len()]))
            }
            "decision_function" => {
                self.check_fitted()?;
                let x = samples(args.first(), "X", "decision_function")?;
                Ok(array(vec![Value::Float(0.0); x.len()]))
            }
            "transform" | "inverse_transform" => self.transform(args),
            "score" => self.score(args),
            _ => Err(no_attribute(self.kind.name(), method)),
        }
    }

    fn getattr(&self, name: &str) -> Result<Option<Value>, ForeignError> {
        let state = self.state.lock();
        if let Some(value) = state.params.get(name) {
            return Ok(Some(value.clone()));
        }

        Ok(match (name, &state.fitted) {
            ("classes_", Some(fitted)) if self.kind.is_classifier() => {
                Some(array(fitted.classes.clone()))
            }
            ("components_", Some(fitted)) if self.kind == MockKind::Pca => {
                let n = state
                    .params
                    .get("n_components")
                    .and_then(Value::as_i64)
                    .map_or(0, |n| n.max(0) as usize);
                let rows = (0..n)
                    .map(|i| {
                        Value::from(
                            (0..fitted.n_features)
                                .map(|j| if i == j { 1.0 } else { 0.0 })
                                .collect::<Vec<_>>(),
                        )
                    })
                    .collect();
                Some(table(rows))
            }
            ("n_features_in_", Some(fitted)) => Some(Value::Int(fitted.n_features as i64)),
            ("_pairwise", _) if self.kind == MockKind::Svc => Some(Value::Bool(
                state.params.get("kernel").and_then(Value::as_str) == Some("precomputed"),
            )),
            _ => None,
        })
    }

    fn hasattr(&self, name: &str) -> Result<bool, ForeignError> {
        Ok(self.kind.supports(name) || self.getattr(name)?.is_some())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator(kind: MockKind) -> MockEstimator {
        MockEstimator::new(kind, Kwargs::new()).unwrap()
    }

    #[test]
    fn test_unknown_constructor_argument_is_a_type_error() {
        let err = MockEstimator::new(
            MockKind::Ridge,
            Kwargs::from([("gamma".to_string(), Value::Int(1))]),
        )
        .unwrap_err();
        assert_eq!(err.exception, "TypeError");
    }

    #[test]
    fn test_import_resolves_known_symbols_only() {
        let runtime = MockRuntime::new();
        assert!(runtime.import("sklearn.svm", "SVC").is_ok());
        assert!(runtime.import("sklearn.base", "clone").is_ok());

        let err = runtime.import("sklearn.svm", "NuSVC").unwrap_err();
        assert!(matches!(err, EstimatorError::MissingBackend { component, .. } if component == "sklearn.svm.NuSVC"));

        let err = runtime.import("sklearn.tree", "DecisionTreeClassifier").unwrap_err();
        assert!(matches!(err, EstimatorError::MissingBackend { component, .. } if component == "sklearn.tree"));
    }

    #[test]
    fn test_calls_are_recorded() {
        let est = estimator(MockKind::Ridge);
        est.call_method("get_params", &[], &Kwargs::new()).unwrap();
        assert!(est.call_method("sample", &[], &Kwargs::new()).is_err());
        assert_eq!(est.call_names(), vec!["get_params", "sample"]);
        assert_eq!(est.calls()[0].thread, thread::current().id());
    }

    #[test]
    fn test_nested_set_params_routes_to_sub_estimator() {
        let base = ForeignValue::new(estimator(MockKind::LogisticRegression));
        let bagging = MockEstimator::new(
            MockKind::BaggingClassifier,
            Kwargs::from([("estimator".to_string(), Value::Foreign(base.clone()))]),
        )
        .unwrap();

        bagging
            .set_params(&Kwargs::from([("estimator__C".to_string(), Value::Float(3.0))]))
            .unwrap();

        let sub = base.downcast_ref::<MockEstimator>().unwrap();
        assert_eq!(sub.param("C"), Some(Value::Float(3.0)));
        assert_eq!(bagging.get_params(true)["estimator__C"], Value::Float(3.0));
    }

    #[test]
    fn test_unfitted_predict_raises_not_fitted() {
        let est = estimator(MockKind::Svc);
        let err = est
            .call_method("predict", &[Value::from(vec![1.0])], &Kwargs::new())
            .unwrap_err();
        assert_eq!(err.exception, "NotFittedError");
    }

    #[test]
    fn test_classes_are_sorted_and_unique() {
        let est = estimator(MockKind::LogisticRegression);
        est.fit(&[Value::from(vec![1.0, 2.0, 3.0]), Value::from(vec![2, 0, 2])])
            .unwrap();
        let classes = est.getattr("classes_").unwrap().unwrap();
        let classes = classes.as_foreign().unwrap().downcast_ref::<MockArray>().unwrap();
        assert_eq!(classes.items(), &[Value::Int(0), Value::Int(2)]);
    }
}
