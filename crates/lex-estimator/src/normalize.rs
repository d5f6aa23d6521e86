//! Conversion of foreign call results into native values.

use crate::value::Value;
use tracing::warn;

/// Normalize a value returned from a foreign call.
///
/// A foreign array-like object of rank 1 becomes a [`Value::List`] holding a
/// copy of its elements. Every other value, including arrays of any other
/// rank, is returned unchanged. Never fails: a rank-1 array whose elements
/// cannot be read is passed through as well.
///
/// Normalization is idempotent.
#[must_use]
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Foreign(object) if object.object().ndim() == Some(1) => {
            match object.object().to_vec() {
                Ok(items) => Value::List(items),
                Err(err) => {
                    warn!(
                        "Could not copy rank-1 {} into a list, passing it through: {}",
                        object.type_name(),
                        err
                    );
                    Value::Foreign(object)
                }
            }
        }
        other => other,
    }
}
