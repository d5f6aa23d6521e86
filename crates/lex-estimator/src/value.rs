//! Values exchanged through the estimator protocol.
//!
//! [`Value`] is the native representation of everything that flows through
//! the protocol: parameter values, call arguments and call results. Besides
//! plain scalars and containers it can hold a nested estimator
//! ([`Value::Estimator`]) or an opaque object owned by the foreign runtime
//! ([`Value::Foreign`]).
//!
//! # Type Mapping
//!
//! | Native | JSON | Typical foreign value |
//! |--------|------|-----------------------|
//! | `None` | `null` | `None` |
//! | `Bool` | `boolean` | `bool` |
//! | `Int` / `Float` | `number` | `int` / `float` |
//! | `Str` | `string` | `str` |
//! | `List` | `array` | `list`, `tuple`, 1-D array (after normalization) |
//! | `Map` | `object` | `dict` with string keys |
//! | `Estimator` | `"<Name>"` | - |
//! | `Foreign` | `"<foreign Type>"` | any other object |

use crate::estimator::EstimatorRef;
use crate::foreign::ForeignValue;
use std::collections::BTreeMap;
use std::fmt;

/// Keyword arguments of a call, keyed by name.
pub type Kwargs = BTreeMap<String, Value>;

/// Parameters produced by `get_params`, keyed by (possibly nested) name.
pub type ParamsMap = BTreeMap<String, Value>;

/// Incoming `set_params` pairs, in the order given by the caller.
pub type Params = Vec<(String, Value)>;

/// A value exchanged through the protocol.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absence of a value.
    #[default]
    None,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// String.
    Str(String),
    /// Ordered sequence.
    List(Vec<Value>),
    /// String-keyed mapping.
    Map(BTreeMap<String, Value>),
    /// A nested estimator, shared by reference.
    Estimator(EstimatorRef),
    /// An opaque object living in the foreign runtime.
    Foreign(ForeignValue),
}

impl Value {
    /// Short name of the value's variant, used in messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Estimator(_) => "estimator",
            Value::Foreign(_) => "foreign",
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value; integers are widened.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_estimator(&self) -> Option<&EstimatorRef> {
        match self {
            Value::Estimator(est) => Some(est),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_foreign(&self) -> Option<&ForeignValue> {
        match self {
            Value::Foreign(obj) => Some(obj),
            _ => None,
        }
    }

    /// Convert to JSON for display or storage.
    ///
    /// Estimators and foreign objects have no JSON form and are rendered as
    /// their display string. Non-finite floats become `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::None => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Estimator(_) | Value::Foreign(_) => serde_json::Value::String(self.to_string()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Estimator(est) => write!(f, "<{}>", est.name()),
            Value::Foreign(obj) => write!(f, "<foreign {}>", obj.type_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::None, Into::into)
    }
}

impl From<EstimatorRef> for Value {
    fn from(est: EstimatorRef) -> Self {
        Value::Estimator(est)
    }
}

impl From<ForeignValue> for Value {
    fn from(obj: ForeignValue) -> Self {
        Value::Foreign(obj)
    }
}

/// Positional and keyword arguments of an operation call.
///
/// Arguments are passed to the foreign side unchanged; only the operation
/// name is translated.
///
/// # Example
///
/// ```
/// use lex_estimator::{Args, Value};
///
/// let args = Args::new()
///     .arg(vec![1.0, 2.0, 3.0])
///     .arg(vec![0, 1, 1])
///     .kwarg("sample_weight", Value::None);
///
/// assert_eq!(args.positional.len(), 2);
/// assert!(args.keyword.contains_key("sample_weight"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    /// Positional arguments, in order.
    pub positional: Vec<Value>,
    /// Keyword arguments.
    pub keyword: Kwargs,
}

impl Args {
    /// Empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    /// Arguments carrying only keywords, e.g. for `set_params`.
    #[must_use]
    pub fn from_kwargs(keyword: Kwargs) -> Self {
        Self {
            positional: Vec::new(),
            keyword,
        }
    }

    /// The `i`-th positional argument, if present.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&Value> {
        self.positional.get(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_roundtrip_of_scalars_and_containers() {
        let json = serde_json::json!({"C": 1.5, "max_iter": 100, "penalty": "l2", "classes": [0, 1], "dual": false, "tol": null});
        let value = Value::from(json.clone());
        let map = value.as_map().unwrap();
        assert_eq!(map["max_iter"], Value::Int(100));
        assert_eq!(map["C"], Value::Float(1.5));
        assert_eq!(map["tol"], Value::None);
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_non_finite_float_is_null_in_json() {
        assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn test_display() {
        let value = Value::from(vec![Value::from(1), Value::from("a"), Value::None]);
        assert_eq!(value.to_string(), r#"[1, "a", None]"#);
    }

    #[test]
    fn test_as_f64_widens_ints() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Str("3".into()).as_f64(), None);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::None);
        assert_eq!(Value::from(Some(2)), Value::Int(2));
    }
}
