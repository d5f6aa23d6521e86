//! Dispatch of estimator operations to foreign objects.
//!
//! Every call into the foreign runtime made by this crate goes through this
//! module. A call:
//!
//! 1. translates the native operation to its foreign method name via the
//!    [`Operation`] table,
//! 2. runs on the designated foreign thread (see [`crate::runtime`]),
//!    passing arguments through unchanged,
//! 3. pipes the raw result through [`normalize`].
//!
//! Foreign exceptions surface as [`EstimatorError::ForeignCall`] with the
//! original exception type and message. Nothing is retried or suppressed.
//!
//! The derived queries ([`get_classes`], [`get_components`],
//! [`is_pairwise`]) are plain attribute reads whose names come from the
//! installed [`EcosystemConfig`](crate::EcosystemConfig); [`clone`] and
//! [`is_classifier`] call the ecosystem's own facilities in its
//! `base_module`.

use crate::error::EstimatorError;
use crate::foreign::ForeignValue;
use crate::normalize::normalize;
use crate::operation::Operation;
use crate::runtime;
use crate::value::{Args, Params, ParamsMap, Value};
use tracing::debug;

/// Invoke `op` on a foreign object and normalize the result.
///
/// # Errors
///
/// - [`EstimatorError::MissingBackend`] if no foreign runtime is installed
/// - [`EstimatorError::ForeignCall`] if the foreign method raises
pub fn invoke(object: &ForeignValue, op: Operation, args: Args) -> Result<Value, EstimatorError> {
    let object = object.clone();
    let method = op.foreign_name();
    runtime::on_foreign_thread(move || {
        debug!("Dispatching {} to {}.{}", op, object.type_name(), method);
        let raw = object
            .object()
            .call_method(method, &args.positional, &args.keyword)?;
        Ok(normalize(raw))
    })
}

/// Call a foreign callable (class or function) and normalize the result.
///
/// # Errors
///
/// Same as [`invoke`].
pub fn call(callable: &ForeignValue, args: Args) -> Result<Value, EstimatorError> {
    let callable = callable.clone();
    runtime::on_foreign_thread(move || {
        debug!("Calling {}", callable.type_name());
        let raw = callable.object().call(&args.positional, &args.keyword)?;
        Ok(normalize(raw))
    })
}

/// Foreign `get_params(deep=...)`.
///
/// # Errors
///
/// [`EstimatorError::Marshal`] if the foreign side does not return a mapping,
/// plus the errors of [`invoke`].
pub fn get_params(object: &ForeignValue, deep: bool) -> Result<ParamsMap, EstimatorError> {
    match invoke(object, Operation::GetParams, Args::new().kwarg("deep", deep))? {
        Value::Map(params) => Ok(params),
        other => Err(EstimatorError::Marshal(format!(
            "get_params of {} returned a {} instead of a mapping",
            object.type_name(),
            other.kind()
        ))),
    }
}

/// Foreign `set_params(**params)`, as a single call. No call is made when
/// `params` is empty.
///
/// # Errors
///
/// Same as [`invoke`]; the foreign side validates the keys.
pub fn set_params(object: &ForeignValue, params: Params) -> Result<(), EstimatorError> {
    if params.is_empty() {
        return Ok(());
    }
    let args = Args::from_kwargs(params.into_iter().collect());
    invoke(object, Operation::SetParams, args).map(|_| ())
}

/// Whether a foreign object exposes `get_params`, i.e. behaves like an
/// estimator.
///
/// # Errors
///
/// Same as [`invoke`].
pub fn is_estimator(object: &ForeignValue) -> Result<bool, EstimatorError> {
    let object = object.clone();
    runtime::on_foreign_thread(move || {
        Ok(object
            .object()
            .hasattr(Operation::GetParams.foreign_name())?)
    })
}

fn read_attribute(object: &ForeignValue, attr: String) -> Result<Option<Value>, EstimatorError> {
    let object = object.clone();
    runtime::on_foreign_thread(move || {
        debug!("Reading {}.{}", object.type_name(), attr);
        Ok(object.object().getattr(&attr)?.map(normalize))
    })
}

/// Classes discovered by the last `fit`; `None` when the attribute is absent
/// (e.g. unfitted).
///
/// # Errors
///
/// Same as [`invoke`].
pub fn get_classes(object: &ForeignValue) -> Result<Option<Value>, EstimatorError> {
    let attr = runtime::config()?.classes_attr.clone();
    read_attribute(object, attr)
}

/// Learned components; `None` when the attribute is absent.
///
/// # Errors
///
/// Same as [`invoke`].
pub fn get_components(object: &ForeignValue) -> Result<Option<Value>, EstimatorError> {
    let attr = runtime::config()?.components_attr.clone();
    read_attribute(object, attr)
}

/// Whether the foreign estimator expects pairwise input. `false` when the
/// attribute is absent or not a boolean.
///
/// # Errors
///
/// Same as [`invoke`].
pub fn is_pairwise(object: &ForeignValue) -> Result<bool, EstimatorError> {
    let attr = runtime::config()?.pairwise_attr.clone();
    Ok(read_attribute(object, attr)?
        .and_then(|value| value.as_bool())
        .unwrap_or(false))
}

/// Deep, unfitted copy via the ecosystem's `clone(obj, safe=...)`.
///
/// The `safe` flag comes from [`EcosystemConfig::clone_safe`](crate::EcosystemConfig::clone_safe).
/// The source object is not touched.
///
/// # Errors
///
/// [`EstimatorError::Marshal`] if the facility does not return an object,
/// plus the errors of [`invoke`].
pub fn clone(object: &ForeignValue) -> Result<ForeignValue, EstimatorError> {
    let config = runtime::config()?;
    let facility = runtime::import(&config.base_module, "clone")?;
    let args = Args::new()
        .arg(object.clone())
        .kwarg("safe", config.clone_safe);

    match call(&facility, args)? {
        Value::Foreign(copy) => Ok(copy),
        other => Err(EstimatorError::Marshal(format!(
            "{}.clone returned a {} instead of an estimator object",
            config.base_module,
            other.kind()
        ))),
    }
}

/// The ecosystem's `is_classifier(obj)`.
///
/// # Errors
///
/// [`EstimatorError::Marshal`] if the facility does not return a boolean,
/// plus the errors of [`invoke`].
pub fn is_classifier(object: &ForeignValue) -> Result<bool, EstimatorError> {
    let config = runtime::config()?;
    let facility = runtime::import(&config.base_module, "is_classifier")?;

    let result = call(&facility, Args::new().arg(object.clone()))?;
    result.as_bool().ok_or_else(|| {
        EstimatorError::Marshal(format!(
            "{}.is_classifier returned a {} instead of a bool",
            config.base_module,
            result.kind()
        ))
    })
}
