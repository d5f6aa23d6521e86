//! Conversion between [`Value`] and Python objects.
//!
//! # Type Mapping
//!
//! | Python | Native |
//! |--------|--------|
//! | `None` | `Value::None` |
//! | `bool` | `Value::Bool` |
//! | `int` (fits in i64) | `Value::Int` |
//! | `float` | `Value::Float` |
//! | `str` | `Value::Str` |
//! | `list`, `tuple` | `Value::List` (recursive) |
//! | `dict` with `str` keys | `Value::Map` (recursive) |
//! | anything else | `Value::Foreign(PyHandle)` |
//!
//! Booleans are checked before integers because `bool` is a subclass of
//! `int` in Python. Arrays stay foreign; the dispatch layer normalizes
//! rank-1 arrays into lists.
//!
//! Native estimators cannot cross into Python and raise `TypeError`.
//! Python exceptions are carried back as [`ForeignError`] by
//! [`map_python_error`].

use crate::error::ForeignError;
use crate::foreign::{ForeignObject, ForeignValue};
use crate::value::{Kwargs, Value};
use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyInt, PyList, PyString, PyTuple};
use std::any::Any;
use std::fmt;

/// A reference to a Python object.
///
/// The type name is read once, when the handle is created on the foreign
/// thread; `type_name` and `Debug` never touch the interpreter. Dropping the
/// handle releases the reference.
pub struct PyHandle {
    object: Py<PyAny>,
    type_name: String,
}

impl PyHandle {
    pub fn new(object: &Bound<'_, PyAny>) -> Self {
        let type_name = object
            .get_type()
            .qualname()
            .map(|name| name.to_string())
            .unwrap_or_else(|_| "object".to_string());
        Self {
            object: object.clone().unbind(),
            type_name,
        }
    }

    /// The Python object, bound to `py`.
    pub fn bind<'py>(&self, py: Python<'py>) -> &Bound<'py, PyAny> {
        self.object.bind(py)
    }
}

impl fmt::Debug for PyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} object>", self.type_name)
    }
}

impl ForeignObject for PyHandle {
    fn type_name(&self) -> String {
        self.type_name.clone()
    }

    fn call(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value, ForeignError> {
        Python::attach(|py| {
            let (args, kwargs) = arguments(py, args, kwargs)?;
            let result = self.bind(py).call(args, Some(&kwargs))?;
            py_to_value(&result)
        })
        .map_err(python_error)
    }

    fn call_method(&self, method: &str, args: &[Value], kwargs: &Kwargs) -> Result<Value, ForeignError> {
        Python::attach(|py| {
            let (args, kwargs) = arguments(py, args, kwargs)?;
            let result = self.bind(py).call_method(method, args, Some(&kwargs))?;
            py_to_value(&result)
        })
        .map_err(python_error)
    }

    fn getattr(&self, name: &str) -> Result<Option<Value>, ForeignError> {
        Python::attach(|py| {
            let object = self.bind(py);
            if !object.hasattr(name)? {
                return Ok(None);
            }
            py_to_value(&object.getattr(name)?).map(Some)
        })
        .map_err(python_error)
    }

    fn hasattr(&self, name: &str) -> Result<bool, ForeignError> {
        Python::attach(|py| self.bind(py).hasattr(name)).map_err(python_error)
    }

    fn ndim(&self) -> Option<usize> {
        Python::attach(|py| {
            let object = self.bind(py);
            if !object.hasattr("tolist").unwrap_or(false) {
                return None;
            }
            object.getattr("ndim").ok()?.extract::<usize>().ok()
        })
    }

    fn to_vec(&self) -> Result<Vec<Value>, ForeignError> {
        Python::attach(|py| {
            let list = self.bind(py).call_method0("tolist")?;
            list.try_iter()?
                .map(|item| py_to_value(&item?))
                .collect::<PyResult<Vec<_>>>()
        })
        .map_err(python_error)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn python_error(err: PyErr) -> ForeignError {
    Python::attach(|py| map_python_error(py, &err))
}

fn arguments<'py>(
    py: Python<'py>,
    args: &[Value],
    kwargs: &Kwargs,
) -> PyResult<(Bound<'py, PyTuple>, Bound<'py, PyDict>)> {
    let positional = args
        .iter()
        .map(|value| value_to_py(py, value))
        .collect::<PyResult<Vec<_>>>()?;
    let keyword = PyDict::new(py);
    for (name, value) in kwargs {
        keyword.set_item(name, value_to_py(py, value)?)?;
    }
    Ok((PyTuple::new(py, positional)?, keyword))
}

/// Convert a [`Value`] into a Python object.
///
/// # Errors
///
/// `TypeError` for native estimators and for foreign values that do not come
/// from this backend.
pub fn value_to_py<'py>(py: Python<'py>, value: &Value) -> PyResult<Bound<'py, PyAny>> {
    match value {
        Value::None => Ok(py.None().into_bound(py)),
        Value::Bool(b) => Ok(b.into_pyobject(py)?.to_owned().into_any()),
        Value::Int(i) => Ok(i.into_pyobject(py)?.into_any()),
        Value::Float(f) => Ok(f.into_pyobject(py)?.into_any()),
        Value::Str(s) => Ok(s.into_pyobject(py)?.into_any()),
        Value::List(items) => {
            let list = PyList::empty(py);
            for item in items {
                list.append(value_to_py(py, item)?)?;
            }
            Ok(list.into_any())
        }
        Value::Map(map) => {
            let dict = PyDict::new(py);
            for (key, item) in map {
                dict.set_item(key, value_to_py(py, item)?)?;
            }
            Ok(dict.into_any())
        }
        Value::Estimator(estimator) => Err(PyTypeError::new_err(format!(
            "native estimator {} cannot be passed to Python",
            estimator.name()
        ))),
        Value::Foreign(object) => object
            .downcast_ref::<PyHandle>()
            .map(|handle| handle.bind(py).clone())
            .ok_or_else(|| {
                PyTypeError::new_err(format!(
                    "foreign object {} does not belong to the Python runtime",
                    object.type_name()
                ))
            }),
    }
}

/// Convert a Python object into a [`Value`]. See the module docs for the
/// mapping.
///
/// # Errors
///
/// Errors raised while iterating containers.
pub fn py_to_value(object: &Bound<'_, PyAny>) -> PyResult<Value> {
    if object.is_none() {
        return Ok(Value::None);
    }

    if object.is_instance_of::<PyBool>() {
        return Ok(Value::Bool(object.extract()?));
    }

    if object.is_instance_of::<PyInt>()
        && let Ok(i) = object.extract::<i64>()
    {
        return Ok(Value::Int(i));
    }

    if object.is_instance_of::<PyFloat>() {
        return Ok(Value::Float(object.extract()?));
    }

    if object.is_instance_of::<PyString>() {
        return Ok(Value::Str(object.extract()?));
    }

    if object.is_instance_of::<PyList>() || object.is_instance_of::<PyTuple>() {
        return object
            .try_iter()?
            .map(|item| py_to_value(&item?))
            .collect::<PyResult<Vec<_>>>()
            .map(Value::List);
    }

    if let Ok(dict) = object.cast::<PyDict>()
        && dict.keys().iter().all(|key| key.is_instance_of::<PyString>())
    {
        let mut map = std::collections::BTreeMap::new();
        for (key, item) in dict.iter() {
            map.insert(key.extract::<String>()?, py_to_value(&item)?);
        }
        return Ok(Value::Map(map));
    }

    Ok(Value::Foreign(ForeignValue::new(PyHandle::new(object))))
}

/// Carry a Python exception across the boundary.
///
/// Keeps the exception's qualified type name and its message.
pub fn map_python_error(py: Python<'_>, err: &PyErr) -> ForeignError {
    let exception = err
        .get_type(py)
        .qualname()
        .map(|name| name.to_string())
        .unwrap_or_default();

    let message = err.value(py).to_string();

    ForeignError::new(exception, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "Requires Python runtime"]
    fn test_scalars_and_containers_cross_unchanged() {
        Python::attach(|py| {
            let value = Value::from(serde_json::json!({
                "C": 1.5, "max_iter": 100, "dual": false, "classes": [0, 1], "tol": null
            }));
            let object = value_to_py(py, &value).unwrap();
            assert_eq!(py_to_value(&object).unwrap(), value);
        });
    }

    #[test]
    #[ignore = "Requires Python runtime"]
    fn test_handle_names_its_type_without_the_interpreter() {
        let handle = Python::attach(|py| {
            let object = py.eval(c"range(3)", None, None).unwrap();
            PyHandle::new(&object)
        });

        let (name, debug) = std::thread::spawn(move || (handle.type_name(), format!("{handle:?}")))
            .join()
            .unwrap();
        assert_eq!(name, "range");
        assert_eq!(debug, "<range object>");
    }

    #[test]
    #[ignore = "Requires Python runtime"]
    fn test_python_exception_keeps_type_and_message() {
        Python::attach(|py| {
            let err = py.eval(c"int('x')", None, None).unwrap_err();
            let foreign = map_python_error(py, &err);
            assert_eq!(foreign.exception, "ValueError");
            assert!(foreign.message.contains("invalid literal"));
        });
    }

    #[test]
    #[ignore = "Requires Python runtime"]
    fn test_native_estimator_cannot_cross() {
        #[derive(Debug)]
        struct Empty;
        impl crate::Estimator for Empty {
            fn param_names(&self) -> Vec<String> {
                Vec::new()
            }
            fn get_param(&self, _: &str) -> Option<Value> {
                None
            }
            fn set_param(&mut self, _: &str, _: Value) -> Result<(), crate::EstimatorError> {
                Ok(())
            }
        }

        Python::attach(|py| {
            let value = Value::Estimator(crate::EstimatorRef::new(Empty));
            let err = value_to_py(py, &value).unwrap_err();
            assert!(err.is_instance_of::<PyTypeError>(py));
        });
    }
}
