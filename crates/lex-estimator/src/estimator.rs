//! The estimator capability set.
//!
//! [`Estimator`] is the uniform interface shared by native estimators and
//! foreign-backed ones ([`ForeignEstimator`](crate::ForeignEstimator)).
//! A native estimator implements four primitives describing its declared
//! parameters:
//!
//! - [`param_names`](Estimator::param_names): the declared parameter names
//! - [`get_param`](Estimator::get_param): current value of one parameter
//! - [`set_param`](Estimator::set_param): assign one parameter
//! - [`clone_unfitted`](Estimator::clone_unfitted): a fresh, unfitted copy
//!
//! and whichever operations it supports (`fit`, `predict`, `transform`, ...).
//! Everything else has a default: deep `get_params`/`set_params` come from
//! the [composite parameter engine](crate::params), unsupported operations
//! return [`EstimatorError::Unsupported`].
//!
//! Composites store sub-estimators as [`EstimatorRef`] parameter values.
//!
//! # Example
//!
//! ```
//! use lex_estimator::{Estimator, EstimatorError, EstimatorRef, Value};
//!
//! #[derive(Debug)]
//! struct Scaler {
//!     mean: f64,
//! }
//!
//! impl Estimator for Scaler {
//!     fn param_names(&self) -> Vec<String> {
//!         vec!["mean".to_string()]
//!     }
//!
//!     fn get_param(&self, name: &str) -> Option<Value> {
//!         (name == "mean").then(|| Value::Float(self.mean))
//!     }
//!
//!     fn set_param(&mut self, name: &str, value: Value) -> Result<(), EstimatorError> {
//!         if name != "mean" {
//!             return Err(EstimatorError::invalid_parameter(name, self.name()));
//!         }
//!         self.mean = value
//!             .as_f64()
//!             .ok_or_else(|| EstimatorError::invalid_value(name, self.name(), "a number"))?;
//!         Ok(())
//!     }
//!
//!     fn clone_unfitted(&self) -> Result<EstimatorRef, EstimatorError> {
//!         Ok(EstimatorRef::new(Scaler { mean: self.mean }))
//!     }
//! }
//!
//! let mut scaler = Scaler { mean: 0.0 };
//! lex_estimator::set_params(&mut scaler, [("mean", 2.5)]).unwrap();
//! assert_eq!(scaler.get_params(false).unwrap()["mean"], Value::Float(2.5));
//! ```

use crate::dispatch;
use crate::error::EstimatorError;
use crate::operation::Operation;
use crate::params;
use crate::value::{Args, Params, ParamsMap, Value};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;

/// An object exposing the estimator capability set.
///
/// See the [module documentation](self) for what implementors must provide.
/// The trait is object safe; composites hold sub-estimators as
/// `dyn Estimator` behind an [`EstimatorRef`].
pub trait Estimator: fmt::Debug + Send {
    /// Identity used in error messages. Defaults to the short type name.
    fn name(&self) -> String {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Names of the parameters declared directly on this estimator.
    fn param_names(&self) -> Vec<String>;

    /// Current value of a declared parameter.
    fn get_param(&self, name: &str) -> Option<Value>;

    /// Assign a declared parameter.
    ///
    /// # Errors
    ///
    /// Implementations return [`EstimatorError::InvalidParameter`] for names
    /// they do not declare and [`EstimatorError::InvalidValue`] for values of
    /// the wrong kind.
    fn set_param(&mut self, name: &str, value: Value) -> Result<(), EstimatorError>;

    /// Parameters of this estimator; with `deep`, also those of every nested
    /// estimator under `name__subname` keys.
    ///
    /// # Errors
    ///
    /// [`EstimatorError::CyclicParameterGraph`] if an estimator is its own
    /// descendant; foreign errors from foreign sub-estimators.
    fn get_params(&self, deep: bool) -> Result<ParamsMap, EstimatorError> {
        params::get_params(self, deep)
    }

    /// Set (possibly nested) parameters in place. See [`params::set_params`].
    ///
    /// # Errors
    ///
    /// [`EstimatorError::InvalidParameter`] before any mutation if a key does
    /// not resolve. [`EstimatorError::InvalidValue`] is only detected while
    /// pairs are applied.
    fn set_params(&mut self, params: Params) -> Result<(), EstimatorError> {
        params::set_params(self, params)
    }

    /// A new estimator with the same parameters and no learned state.
    ///
    /// Sub-estimators may be shared with `self`; [`clone`] replaces them with
    /// their own clones unless [`clone_is_deep`](Self::clone_is_deep).
    fn clone_unfitted(&self) -> Result<EstimatorRef, EstimatorError> {
        Err(EstimatorError::unsupported("clone", self.name()))
    }

    /// Whether [`clone_unfitted`](Self::clone_unfitted) already copies every
    /// nested estimator.
    fn clone_is_deep(&self) -> bool {
        false
    }

    /// Whether the estimator is a classifier.
    fn is_classifier(&self) -> Result<bool, EstimatorError> {
        Ok(false)
    }

    /// Whether the estimator expects pairwise input (kernel or distance
    /// matrices) instead of raw samples.
    fn is_pairwise(&self) -> Result<bool, EstimatorError> {
        Ok(false)
    }

    /// Output classes discovered by `fit`, if any.
    fn classes(&self) -> Result<Option<Value>, EstimatorError> {
        Ok(None)
    }

    /// Learned components (basis vectors), if any.
    fn components(&self) -> Result<Option<Value>, EstimatorError> {
        Ok(None)
    }

    fn fit(&mut self, _args: &Args) -> Result<(), EstimatorError> {
        Err(unsupported(self, Operation::Fit))
    }

    fn partial_fit(&mut self, _args: &Args) -> Result<(), EstimatorError> {
        Err(unsupported(self, Operation::PartialFit))
    }

    /// Fit, then transform the same input.
    ///
    /// The default calls [`fit`](Self::fit) with all arguments and
    /// [`transform`](Self::transform) with the first positional one.
    fn fit_transform(&mut self, args: &Args) -> Result<Value, EstimatorError> {
        self.fit(args)?;
        let mut transform_args = Args::new();
        if let Some(x) = args.get(0) {
            transform_args = transform_args.arg(x.clone());
        }
        self.transform(&transform_args)
    }

    fn predict(&self, _args: &Args) -> Result<Value, EstimatorError> {
        Err(unsupported(self, Operation::Predict))
    }

    fn predict_proba(&self, _args: &Args) -> Result<Value, EstimatorError> {
        Err(unsupported(self, Operation::PredictProba))
    }

    fn predict_log_proba(&self, _args: &Args) -> Result<Value, EstimatorError> {
        Err(unsupported(self, Operation::PredictLogProba))
    }

    fn transform(&self, _args: &Args) -> Result<Value, EstimatorError> {
        Err(unsupported(self, Operation::Transform))
    }

    fn inverse_transform(&self, _args: &Args) -> Result<Value, EstimatorError> {
        Err(unsupported(self, Operation::InverseTransform))
    }

    fn decision_function(&self, _args: &Args) -> Result<Value, EstimatorError> {
        Err(unsupported(self, Operation::DecisionFunction))
    }

    fn score_samples(&self, _args: &Args) -> Result<Value, EstimatorError> {
        Err(unsupported(self, Operation::ScoreSamples))
    }

    fn sample(&self, _args: &Args) -> Result<Value, EstimatorError> {
        Err(unsupported(self, Operation::Sample))
    }

    fn score(&self, _args: &Args) -> Result<Value, EstimatorError> {
        Err(unsupported(self, Operation::Score))
    }

    fn get_feature_names(&self, _args: &Args) -> Result<Value, EstimatorError> {
        Err(unsupported(self, Operation::GetFeatureNames))
    }
}

fn unsupported<E: Estimator + ?Sized>(estimator: &E, op: Operation) -> EstimatorError {
    EstimatorError::unsupported(op.native_name(), estimator.name())
}

fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// Shared, lockable handle to an estimator.
///
/// This is how composites hold sub-estimators: `get_params` hands out the
/// same handle, so a nested `set_params` mutates the sub-estimator the
/// composite actually uses. Equality is identity.
///
/// Mutating access must hold the lock; the protocol performs no locking of
/// its own beyond this handle.
#[derive(Clone)]
pub struct EstimatorRef(Arc<Mutex<dyn Estimator>>);

impl EstimatorRef {
    pub fn new<E: Estimator + 'static>(estimator: E) -> Self {
        Self(Arc::new(Mutex::new(estimator)))
    }

    /// Lock the estimator for access.
    pub fn lock(&self) -> MutexGuard<'_, dyn Estimator> {
        self.0.lock()
    }

    /// Lock the estimator if no one else holds it.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, dyn Estimator>> {
        self.0.try_lock()
    }

    /// Name of the estimator, without blocking.
    #[must_use]
    pub fn name(&self) -> String {
        self.try_lock()
            .map(|estimator| estimator.name())
            .unwrap_or_else(|| "<locked estimator>".to_string())
    }

    /// Whether both handles refer to the same estimator.
    #[must_use]
    pub fn ptr_eq(&self, other: &EstimatorRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the estimator, without locking. Matches the address of
    /// `&*self.lock()`.
    pub(crate) fn addr(&self) -> usize {
        self.0.data_ptr() as *const () as usize
    }
}

impl PartialEq for EstimatorRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for EstimatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_lock() {
            Some(estimator) => estimator.fmt(f),
            None => f.write_str("<locked estimator>"),
        }
    }
}

/// Invoke an operation by its table entry.
///
/// Routes `op` to the corresponding [`Estimator`] method, so string-driven
/// callers (see [`Operation::from_native_name`]) reach native and foreign
/// estimators alike. `fit!`, `partial_fit!` and `set_params!` return
/// [`Value::None`]; `get_params` reads its `deep` keyword (default `true`)
/// and returns a [`Value::Map`].
///
/// # Errors
///
/// Whatever the routed method returns.
pub fn invoke<E: Estimator + ?Sized>(
    estimator: &mut E,
    op: Operation,
    args: &Args,
) -> Result<Value, EstimatorError> {
    match op {
        Operation::Fit => estimator.fit(args).map(|()| Value::None),
        Operation::PartialFit => estimator.partial_fit(args).map(|()| Value::None),
        Operation::FitTransform => estimator.fit_transform(args),
        Operation::SetParams => {
            let params = args.keyword.clone().into_iter().collect();
            estimator.set_params(params).map(|()| Value::None)
        }
        Operation::GetParams => {
            let deep = args
                .keyword
                .get("deep")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            estimator.get_params(deep).map(Value::Map)
        }
        Operation::Predict => estimator.predict(args),
        Operation::PredictProba => estimator.predict_proba(args),
        Operation::PredictLogProba => estimator.predict_log_proba(args),
        Operation::Transform => estimator.transform(args),
        Operation::InverseTransform => estimator.inverse_transform(args),
        Operation::DecisionFunction => estimator.decision_function(args),
        Operation::ScoreSamples => estimator.score_samples(args),
        Operation::Sample => estimator.sample(args),
        Operation::Score => estimator.score(args),
        Operation::GetFeatureNames => estimator.get_feature_names(args),
    }
}

/// Parameters of any estimator, deep or shallow.
///
/// # Errors
///
/// See [`Estimator::get_params`].
pub fn get_params<E: Estimator + ?Sized>(
    estimator: &E,
    deep: bool,
) -> Result<ParamsMap, EstimatorError> {
    estimator.get_params(deep)
}

/// Set (possibly nested) parameters and return the estimator for chaining.
///
/// ```
/// # use lex_estimator::{Estimator, EstimatorError, Value};
/// # #[derive(Debug, Default)]
/// # struct Ridge { alpha: f64, max_iter: i64 }
/// # impl Estimator for Ridge {
/// #     fn param_names(&self) -> Vec<String> { vec!["alpha".into(), "max_iter".into()] }
/// #     fn get_param(&self, name: &str) -> Option<Value> {
/// #         match name { "alpha" => Some(self.alpha.into()), "max_iter" => Some(self.max_iter.into()), _ => None }
/// #     }
/// #     fn set_param(&mut self, name: &str, value: Value) -> Result<(), EstimatorError> {
/// #         match name {
/// #             "alpha" => self.alpha = value.as_f64().unwrap_or_default(),
/// #             _ => self.max_iter = value.as_i64().unwrap_or_default(),
/// #         }
/// #         Ok(())
/// #     }
/// # }
/// let mut ridge = Ridge::default();
/// let params = lex_estimator::set_params(&mut ridge, [("alpha", 0.5)])
///     .unwrap()
///     .get_params(false)
///     .unwrap();
/// assert_eq!(params["alpha"], Value::Float(0.5));
/// ```
///
/// # Errors
///
/// See [`Estimator::set_params`].
pub fn set_params<E, I, K, V>(estimator: &mut E, params: I) -> Result<&mut E, EstimatorError>
where
    E: Estimator + ?Sized,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    let params = params
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect();
    estimator.set_params(params)?;
    Ok(estimator)
}

/// Fit on `args`, then transform the same input.
///
/// # Errors
///
/// See [`Estimator::fit_transform`].
pub fn fit_transform<E: Estimator + ?Sized>(
    estimator: &mut E,
    args: &Args,
) -> Result<Value, EstimatorError> {
    estimator.fit_transform(args)
}

/// A deep, unfitted copy of `estimator`.
///
/// Calls [`Estimator::clone_unfitted`], then replaces every parameter that
/// holds a sub-estimator by that sub-estimator's own clone, so the copy
/// shares nothing mutable with the source. Native sub-estimators are cloned
/// recursively; foreign ones ([`Value::Foreign`] objects exposing
/// `get_params`) are cloned by the foreign ecosystem, which copies their own
/// nested estimators. The source is not mutated.
///
/// # Errors
///
/// - [`EstimatorError::CyclicParameterGraph`] if the parameter tree has a cycle
/// - [`EstimatorError::Unsupported`] if some estimator in the tree cannot be cloned
/// - foreign errors raised while cloning foreign sub-estimators
pub fn clone<E: Estimator + ?Sized>(estimator: &E) -> Result<EstimatorRef, EstimatorError> {
    // Rejects cycles before recursing.
    estimator.get_params(true)?;
    clone_tree(estimator)
}

fn clone_tree<E: Estimator + ?Sized>(estimator: &E) -> Result<EstimatorRef, EstimatorError> {
    let copy = estimator.clone_unfitted()?;
    if estimator.clone_is_deep() {
        return Ok(copy);
    }

    {
        let mut guard = copy.lock();
        for name in guard.param_names() {
            match guard.get_param(&name) {
                Some(Value::Estimator(sub)) => {
                    let sub_copy = clone_tree(&*sub.lock())?;
                    guard.set_param(&name, Value::Estimator(sub_copy))?;
                }
                Some(Value::Foreign(object)) if dispatch::is_estimator(&object)? => {
                    guard.set_param(&name, Value::Foreign(dispatch::clone(&object)?))?;
                }
                _ => {}
            }
        }
    }
    Ok(copy)
}

/// Whether `estimator` is a classifier.
///
/// # Errors
///
/// Foreign errors for foreign-backed estimators.
pub fn is_classifier<E: Estimator + ?Sized>(estimator: &E) -> Result<bool, EstimatorError> {
    estimator.is_classifier()
}

/// Whether `estimator` expects pairwise input. `false` unless overridden.
///
/// # Errors
///
/// Foreign errors for foreign-backed estimators.
pub fn is_pairwise<E: Estimator + ?Sized>(estimator: &E) -> Result<bool, EstimatorError> {
    estimator.is_pairwise()
}

/// Classes discovered by the last `fit`, `None` when unfitted.
///
/// # Errors
///
/// Foreign errors for foreign-backed estimators.
pub fn get_classes<E: Estimator + ?Sized>(estimator: &E) -> Result<Option<Value>, EstimatorError> {
    estimator.classes()
}

/// Learned components, `None` when unfitted or not applicable.
///
/// # Errors
///
/// Foreign errors for foreign-backed estimators.
pub fn get_components<E: Estimator + ?Sized>(
    estimator: &E,
) -> Result<Option<Value>, EstimatorError> {
    estimator.components()
}

static_assertions::assert_impl_all!(EstimatorRef: Send, Sync);
static_assertions::assert_impl_all!(Value: Send, Sync);
