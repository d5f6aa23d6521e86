//! Capability interface of the foreign boundary.
//!
//! The protocol never reflects on foreign objects ad hoc. Everything it needs
//! from the foreign side goes through two small traits:
//!
//! - [`ForeignObject`]: an object living in the foreign runtime: it can be
//!   called, have methods called on it, have attributes read, and (when it is
//!   array-like) report its rank and copy out its elements.
//! - [`ForeignRuntime`]: the runtime itself: it knows its
//!   [`EcosystemConfig`] and resolves symbols by dotted module path.
//!
//! The Python backend ([`crate::python`], feature `python`) and the in-memory
//! ecosystem in [`crate::testing`] both implement these traits.
//!
//! [`ForeignEstimator`] wraps a foreign object and routes every capability of
//! the [`Estimator`] trait through the [`dispatch`](crate::dispatch) layer,
//! so calling code cannot tell it apart from a native estimator.

use crate::config::EcosystemConfig;
use crate::dispatch;
use crate::error::{EstimatorError, ForeignError};
use crate::estimator::{Estimator, EstimatorRef};
use crate::operation::Operation;
use crate::runtime;
use crate::value::{Args, Kwargs, Params, ParamsMap, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// An object owned by the foreign runtime.
///
/// Implementations marshal [`Value`]s across the boundary and report foreign
/// exceptions as [`ForeignError`]. Return values are *raw*: array-like
/// results come back as [`Value::Foreign`] and are normalized by the
/// dispatch layer.
pub trait ForeignObject: fmt::Debug + Send + Sync + 'static {
    /// Foreign type name, used in messages.
    ///
    /// May be called from any thread, so implementations must answer without
    /// entering the foreign runtime.
    fn type_name(&self) -> String;

    /// Call the object itself (classes and functions).
    fn call(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value, ForeignError>;

    /// Call a method by its foreign name.
    fn call_method(&self, method: &str, args: &[Value], kwargs: &Kwargs)
    -> Result<Value, ForeignError>;

    /// Read an attribute. `Ok(None)` when the attribute does not exist.
    fn getattr(&self, name: &str) -> Result<Option<Value>, ForeignError>;

    /// Whether the object has an attribute or method called `name`.
    fn hasattr(&self, name: &str) -> Result<bool, ForeignError> {
        Ok(self.getattr(name)?.is_some())
    }

    /// Rank of the object if it is array-like, `None` otherwise.
    fn ndim(&self) -> Option<usize> {
        None
    }

    /// Element-wise copy of a rank-1 array-like object.
    fn to_vec(&self) -> Result<Vec<Value>, ForeignError> {
        Err(ForeignError::new(
            "TypeError",
            format!("'{}' object is not array-like", self.type_name()),
        ))
    }

    /// Upcast for downcasting to the concrete backend type.
    fn as_any(&self) -> &dyn Any;
}

/// A foreign runtime that can resolve symbols.
pub trait ForeignRuntime: Send + Sync + 'static {
    /// The ecosystem this runtime talks to.
    fn config(&self) -> &EcosystemConfig;

    /// Resolve `symbol` in the dotted `module` path.
    ///
    /// # Errors
    ///
    /// Must return [`EstimatorError::MissingBackend`] when the module or the
    /// symbol cannot be found, naming what is missing.
    fn import(&self, module: &str, symbol: &str) -> Result<ForeignValue, EstimatorError>;
}

/// Shared handle to a [`ForeignObject`].
///
/// Cloning the handle clones the reference, not the foreign object.
/// Equality is identity.
#[derive(Clone)]
pub struct ForeignValue(Arc<dyn ForeignObject>);

impl ForeignValue {
    pub fn new<T: ForeignObject>(object: T) -> Self {
        Self(Arc::new(object))
    }

    pub fn from_arc(object: Arc<dyn ForeignObject>) -> Self {
        Self(object)
    }

    /// The underlying foreign object.
    #[must_use]
    pub fn object(&self) -> &dyn ForeignObject {
        self.0.as_ref()
    }

    #[must_use]
    pub fn type_name(&self) -> String {
        self.0.type_name()
    }

    /// Whether both handles refer to the same foreign object.
    #[must_use]
    pub fn ptr_eq(&self, other: &ForeignValue) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    /// Downcast to the concrete backend type.
    #[must_use]
    pub fn downcast_ref<T: ForeignObject>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl PartialEq for ForeignValue {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ForeignValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An estimator whose capabilities are serviced by a foreign object.
///
/// Holds its own reference to the foreign object and releases it when
/// dropped. All operations go through [`dispatch`](crate::dispatch), which
/// translates the operation name, runs the call on the designated foreign
/// thread and normalizes the result.
///
/// # Example
///
/// ```rust,ignore
/// use lex_estimator::{Args, Estimator, ForeignEstimator};
///
/// let mut clf = ForeignEstimator::construct(
///     "sklearn.linear_model",
///     "LogisticRegression",
///     Args::new().kwarg("C", 10.0),
/// )?;
/// clf.fit(&Args::new().arg(x).arg(y))?;
/// let labels = clf.predict(&Args::new().arg(x_test))?;
/// ```
#[derive(Debug, PartialEq)]
pub struct ForeignEstimator {
    object: ForeignValue,
}

impl ForeignEstimator {
    /// Wrap a foreign object.
    pub fn new(object: ForeignValue) -> Self {
        Self { object }
    }

    /// Import `class` from `module` and call it with `args`.
    ///
    /// This is the explicit, construction-time replacement for binding
    /// foreign symbols at compile time.
    ///
    /// # Errors
    ///
    /// - [`EstimatorError::MissingBackend`] if no runtime is installed or the
    ///   symbol cannot be resolved
    /// - [`EstimatorError::NativeModule`] if `module` is provided natively
    /// - [`EstimatorError::ForeignCall`] if the constructor raises
    /// - [`EstimatorError::Marshal`] if the constructor does not return an object
    pub fn construct(module: &str, class: &str, args: Args) -> Result<Self, EstimatorError> {
        let constructor = runtime::import(module, class)?;
        match dispatch::call(&constructor, args)? {
            Value::Foreign(object) => Ok(Self::new(object)),
            other => Err(EstimatorError::Marshal(format!(
                "{module}.{class} returned a {} instead of an estimator object",
                other.kind()
            ))),
        }
    }

    /// The wrapped foreign object.
    #[must_use]
    pub fn object(&self) -> &ForeignValue {
        &self.object
    }

    /// Release the wrapper and return the foreign reference.
    #[must_use]
    pub fn into_object(self) -> ForeignValue {
        self.object
    }

    /// Wrap into a shared handle, e.g. to nest it in a native composite.
    #[must_use]
    pub fn into_ref(self) -> EstimatorRef {
        EstimatorRef::new(self)
    }

    fn query(&self, op: Operation, args: &Args) -> Result<Value, EstimatorError> {
        dispatch::invoke(&self.object, op, args.clone())
    }

    fn shallow_params(&self) -> Option<ParamsMap> {
        dispatch::get_params(&self.object, false)
            .inspect_err(|err| warn!("Reading parameters of {} failed: {}", self.name(), err))
            .ok()
    }
}

impl Estimator for ForeignEstimator {
    fn name(&self) -> String {
        self.object.type_name()
    }

    // The protocol reads foreign parameters through `get_params`; these two
    // only serve direct callers, which get `None` or nothing on failure.
    fn param_names(&self) -> Vec<String> {
        self.shallow_params()
            .map(|params| params.into_keys().collect())
            .unwrap_or_default()
    }

    fn get_param(&self, name: &str) -> Option<Value> {
        self.shallow_params()
            .and_then(|mut params| params.remove(name))
    }

    fn set_param(&mut self, name: &str, value: Value) -> Result<(), EstimatorError> {
        dispatch::set_params(&self.object, vec![(name.to_string(), value)])
    }

    fn get_params(&self, deep: bool) -> Result<ParamsMap, EstimatorError> {
        dispatch::get_params(&self.object, deep)
    }

    fn set_params(&mut self, params: Params) -> Result<(), EstimatorError> {
        // The foreign side routes nested keys and validates them itself.
        dispatch::set_params(&self.object, params)
    }

    fn clone_unfitted(&self) -> Result<EstimatorRef, EstimatorError> {
        Ok(Self::new(dispatch::clone(&self.object)?).into_ref())
    }

    fn clone_is_deep(&self) -> bool {
        true
    }

    fn is_classifier(&self) -> Result<bool, EstimatorError> {
        dispatch::is_classifier(&self.object)
    }

    fn is_pairwise(&self) -> Result<bool, EstimatorError> {
        dispatch::is_pairwise(&self.object)
    }

    fn classes(&self) -> Result<Option<Value>, EstimatorError> {
        dispatch::get_classes(&self.object)
    }

    fn components(&self) -> Result<Option<Value>, EstimatorError> {
        dispatch::get_components(&self.object)
    }

    fn fit(&mut self, args: &Args) -> Result<(), EstimatorError> {
        self.query(Operation::Fit, args).map(|_| ())
    }

    fn partial_fit(&mut self, args: &Args) -> Result<(), EstimatorError> {
        self.query(Operation::PartialFit, args).map(|_| ())
    }

    fn fit_transform(&mut self, args: &Args) -> Result<Value, EstimatorError> {
        self.query(Operation::FitTransform, args)
    }

    fn predict(&self, args: &Args) -> Result<Value, EstimatorError> {
        self.query(Operation::Predict, args)
    }

    fn predict_proba(&self, args: &Args) -> Result<Value, EstimatorError> {
        self.query(Operation::PredictProba, args)
    }

    fn predict_log_proba(&self, args: &Args) -> Result<Value, EstimatorError> {
        self.query(Operation::PredictLogProba, args)
    }

    fn transform(&self, args: &Args) -> Result<Value, EstimatorError> {
        self.query(Operation::Transform, args)
    }

    fn inverse_transform(&self, args: &Args) -> Result<Value, EstimatorError> {
        self.query(Operation::InverseTransform, args)
    }

    fn decision_function(&self, args: &Args) -> Result<Value, EstimatorError> {
        self.query(Operation::DecisionFunction, args)
    }

    fn score_samples(&self, args: &Args) -> Result<Value, EstimatorError> {
        self.query(Operation::ScoreSamples, args)
    }

    fn sample(&self, args: &Args) -> Result<Value, EstimatorError> {
        self.query(Operation::Sample, args)
    }

    fn score(&self, args: &Args) -> Result<Value, EstimatorError> {
        self.query(Operation::Score, args)
    }

    fn get_feature_names(&self, args: &Args) -> Result<Value, EstimatorError> {
        self.query(Operation::GetFeatureNames, args)
    }
}

static_assertions::assert_impl_all!(ForeignValue: Send, Sync);
static_assertions::assert_impl_all!(ForeignEstimator: Send, Sync);
