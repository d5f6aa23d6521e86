//! Composite parameter engine.
//!
//! Estimators nest other estimators as parameter values. Nested parameters
//! are addressed with `__`-delimited paths: `clf__C` is parameter `C` of the
//! sub-estimator bound to `clf`, and `a__b__c` nests one level deeper.
//!
//! - [`get_params`] with `deep = true` flattens every descendant parameter
//!   under its path, for native ([`Value::Estimator`]) and foreign
//!   ([`Value::Foreign`]) sub-estimators alike.
//! - [`set_params`] validates every incoming path before mutating anything,
//!   then routes each pair to the estimator that owns it, one nested call per
//!   key.
//!
//! Parameter trees must be acyclic. A cycle is reported as
//! [`EstimatorError::CyclicParameterGraph`] with the path that closed it.

use crate::dispatch;
use crate::error::EstimatorError;
use crate::estimator::Estimator;
use crate::value::{Params, ParamsMap, Value};
use std::cell::RefCell;
use tracing::debug;

/// Separator between the segments of a nested parameter path.
pub const DELIMITER: &str = "__";

thread_local! {
    /// Addresses of the estimators on the current deep traversal path.
    static ANCESTORS: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks an estimator as being traversed until dropped.
struct Visit;

impl Visit {
    fn enter(addr: usize) -> Self {
        ANCESTORS.with(|stack| stack.borrow_mut().push(addr));
        Visit
    }
}

impl Drop for Visit {
    fn drop(&mut self) {
        ANCESTORS.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

fn is_ancestor(addr: usize) -> bool {
    ANCESTORS.with(|stack| stack.borrow().contains(&addr))
}

fn address_of<E: Estimator + ?Sized>(estimator: &E) -> usize {
    estimator as *const E as *const () as usize
}

/// Split a key on the first delimiter: `"a__b__c"` becomes `("a", Some("b__c"))`.
#[must_use]
pub fn split_param_path(key: &str) -> (&str, Option<&str>) {
    match key.split_once(DELIMITER) {
        Some((name, rest)) => (name, Some(rest)),
        None => (key, None),
    }
}

/// Parameters of `estimator`; with `deep`, also every descendant's under
/// `name__subname`.
///
/// Sub-estimators are returned as-is under their own name in both modes.
///
/// # Errors
///
/// - [`EstimatorError::CyclicParameterGraph`] if an estimator is its own descendant
/// - errors raised by foreign sub-estimators
pub fn get_params<E: Estimator + ?Sized>(
    estimator: &E,
    deep: bool,
) -> Result<ParamsMap, EstimatorError> {
    let mut params: ParamsMap = estimator
        .param_names()
        .into_iter()
        .filter_map(|name| estimator.get_param(&name).map(|value| (name, value)))
        .collect();

    if !deep {
        return Ok(params);
    }

    let _visit = Visit::enter(address_of(estimator));
    let mut nested = Vec::new();

    for (name, value) in &params {
        let sub_params = match value {
            Value::Estimator(sub) => {
                if is_ancestor(sub.addr()) {
                    return Err(EstimatorError::CyclicParameterGraph { path: name.clone() });
                }
                sub.lock().get_params(true)
            }
            Value::Foreign(object) => {
                if !dispatch::is_estimator(object)? {
                    continue;
                }
                dispatch::get_params(object, true)
            }
            _ => continue,
        };

        let sub_params = sub_params.map_err(|err| match err {
            EstimatorError::CyclicParameterGraph { path } => EstimatorError::CyclicParameterGraph {
                path: format!("{name}{DELIMITER}{path}"),
            },
            other => other,
        })?;

        nested.extend(
            sub_params
                .into_iter()
                .map(|(key, value)| (format!("{name}{DELIMITER}{key}"), value)),
        );
    }

    params.extend(nested);
    Ok(params)
}

/// Set (possibly nested) parameters on `estimator` in place.
///
/// An empty `params` returns immediately without reading any parameters.
/// Otherwise every segment of every key is checked against the deep
/// parameters first, so an invalid key leaves the whole tree untouched.
/// Single-segment keys go to [`Estimator::set_param`]; nested keys are
/// forwarded, with their first segment removed, to the `set_params` of the
/// sub-estimator currently bound to that segment. Keys sharing a prefix are
/// not coalesced.
///
/// Values are checked by the owning estimator as each pair is applied, so an
/// [`EstimatorError::InvalidValue`] can leave earlier pairs assigned. The
/// same holds when an earlier pair rebinds a prefix to something that is not
/// an estimator.
///
/// # Errors
///
/// - [`EstimatorError::InvalidParameter`] naming the first segment that does
///   not resolve and the estimator it was looked up on
/// - [`EstimatorError::InvalidValue`] from [`Estimator::set_param`]
/// - errors from [`get_params`] and from the sub-estimators
pub fn set_params<E: Estimator + ?Sized>(
    estimator: &mut E,
    params: Params,
) -> Result<(), EstimatorError> {
    if params.is_empty() {
        return Ok(());
    }

    let valid = estimator.get_params(true)?;
    for (key, _) in &params {
        validate_path(estimator, &valid, key)?;
    }

    for (key, value) in params {
        debug!("Setting parameter '{}' on {}", key, estimator.name());
        match split_param_path(&key) {
            (name, None) => estimator.set_param(name, value)?,
            (name, Some(rest)) => {
                let nested = vec![(rest.to_string(), value)];
                match estimator.get_param(name) {
                    Some(Value::Estimator(sub)) => sub.lock().set_params(nested)?,
                    Some(Value::Foreign(object)) => dispatch::set_params(&object, nested)?,
                    _ => return Err(not_composite(name, rest, estimator.name())),
                }
            }
        }
    }

    Ok(())
}

/// Check that every prefix of `key` is a deep parameter.
fn validate_path<E: Estimator + ?Sized>(
    estimator: &E,
    valid: &ParamsMap,
    key: &str,
) -> Result<(), EstimatorError> {
    let segments: Vec<&str> = key.split(DELIMITER).collect();

    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(EstimatorError::invalid_parameter(key, estimator.name()));
    }

    let mut owner = estimator.name();
    for depth in 1..=segments.len() {
        let prefix = segments[..depth].join(DELIMITER);
        let Some(value) = valid.get(&prefix) else {
            return Err(EstimatorError::invalid_parameter(segments[depth - 1], owner));
        };
        if depth == segments.len() {
            break;
        }
        owner = match value {
            Value::Estimator(sub) => sub.name(),
            Value::Foreign(object) => object.type_name(),
            _ => return Err(not_composite(segments[depth - 1], segments[depth], owner)),
        };
    }

    Ok(())
}

/// `name` on `owner` holds no estimator, so `rest` cannot be routed into it.
fn not_composite(name: &str, rest: &str, owner: String) -> EstimatorError {
    EstimatorError::InvalidParameter {
        parameter: split_param_path(rest).0.to_string(),
        estimator: owner,
        reason: Some(format!("'{name}' is not a composite estimator")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::EstimatorRef;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    /// Native estimator with free-form parameters.
    #[derive(Debug)]
    struct Node {
        label: &'static str,
        params: BTreeMap<String, Value>,
    }

    impl Node {
        fn new(label: &'static str, params: Vec<(&str, Value)>) -> Self {
            Self {
                label,
                params: params
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value))
                    .collect(),
            }
        }
    }

    impl Estimator for Node {
        fn name(&self) -> String {
            self.label.to_string()
        }

        fn param_names(&self) -> Vec<String> {
            self.params.keys().cloned().collect()
        }

        fn get_param(&self, name: &str) -> Option<Value> {
            self.params.get(name).cloned()
        }

        fn set_param(&mut self, name: &str, value: Value) -> Result<(), EstimatorError> {
            match self.params.get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(EstimatorError::invalid_parameter(name, self.name())),
            }
        }
    }

    fn leaf(label: &'static str, alpha: i64) -> EstimatorRef {
        EstimatorRef::new(Node::new(label, vec![("alpha", Value::Int(alpha))]))
    }

    #[test]
    fn test_split_on_first_delimiter_only() {
        assert_eq!(split_param_path("a__b__c"), ("a", Some("b__c")));
        assert_eq!(split_param_path("alpha"), ("alpha", None));
        assert_eq!(split_param_path("a__"), ("a", Some("")));
    }

    #[test]
    fn test_shallow_params_keep_sub_estimators_opaque() {
        let sub = leaf("Leaf", 1);
        let root = Node::new("Root", vec![("sub", sub.clone().into()), ("k", 3.into())]);

        let params = get_params(&root, false).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params["sub"], Value::Estimator(sub));
    }

    #[test]
    fn test_deep_params_flatten_descendants() {
        let inner = leaf("Inner", 7);
        let middle = EstimatorRef::new(Node::new("Middle", vec![("inner", inner.into())]));
        let root = Node::new("Root", vec![("middle", middle.into()), ("k", 3.into())]);

        let keys: Vec<String> = get_params(&root, true).unwrap().into_keys().collect();
        assert_eq!(keys, vec!["k", "middle", "middle__inner", "middle__inner__alpha"]);
    }

    #[test]
    fn test_nested_set_equals_direct_set() {
        let sub = leaf("Leaf", 1);
        let mut root = Node::new("Root", vec![("sub", sub.clone().into()), ("k", 3.into())]);

        set_params(&mut root, vec![("sub__alpha".to_string(), Value::Int(5))]).unwrap();

        assert_eq!(sub.lock().get_param("alpha"), Some(Value::Int(5)));
        assert_eq!(root.get_param("k"), Some(Value::Int(3)));
    }

    #[test]
    fn test_multi_level_path() {
        let inner = leaf("Inner", 7);
        let middle = EstimatorRef::new(Node::new("Middle", vec![("inner", inner.clone().into())]));
        let mut root = Node::new("Root", vec![("middle", middle.into())]);

        set_params(&mut root, vec![("middle__inner__alpha".to_string(), 9.into())]).unwrap();
        assert_eq!(inner.lock().get_param("alpha"), Some(Value::Int(9)));
    }

    #[test]
    fn test_replacing_a_sub_estimator_then_addressing_it() {
        let old = leaf("Old", 1);
        let new = leaf("New", 2);
        let mut root = Node::new("Root", vec![("sub", old.clone().into())]);

        set_params(
            &mut root,
            vec![
                ("sub".to_string(), new.clone().into()),
                ("sub__alpha".to_string(), 20.into()),
            ],
        )
        .unwrap();

        assert_eq!(new.lock().get_param("alpha"), Some(Value::Int(20)));
        assert_eq!(old.lock().get_param("alpha"), Some(Value::Int(1)));
    }

    #[test]
    fn test_invalid_segment_is_named_with_its_owner() {
        let sub = leaf("Leaf", 1);
        let mut root = Node::new("Root", vec![("sub", sub.into())]);

        let err = set_params(&mut root, vec![("sub__gamma".to_string(), 1.into())]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid parameter 'gamma' for estimator Leaf");

        let err = set_params(&mut root, vec![("nope__alpha".to_string(), 1.into())]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid parameter 'nope' for estimator Root");
    }

    #[test]
    fn test_validation_happens_before_any_mutation() {
        let sub = leaf("Leaf", 1);
        let mut root = Node::new("Root", vec![("sub", sub.clone().into()), ("k", 3.into())]);

        let result = set_params(
            &mut root,
            vec![
                ("k".to_string(), 4.into()),
                ("sub__alpha".to_string(), 5.into()),
                ("unknown__x".to_string(), 1.into()),
            ],
        );

        assert!(matches!(result, Err(EstimatorError::InvalidParameter { .. })));
        assert_eq!(root.get_param("k"), Some(Value::Int(3)));
        assert_eq!(sub.lock().get_param("alpha"), Some(Value::Int(1)));
    }

    #[test]
    fn test_empty_segment_names_the_full_key() {
        let mut root = Node::new("Root", vec![("sub", leaf("Leaf", 1).into())]);
        let err = set_params(&mut root, vec![("sub__".to_string(), 1.into())]).unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::InvalidParameter { parameter, .. } if parameter == "sub__"
        ));
    }

    #[test]
    fn test_nested_key_on_scalar_parameter_is_invalid() {
        let mut root = Node::new("Root", vec![("k", 3.into())]);
        let err = set_params(&mut root, vec![("k__x".to_string(), 1.into())]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'x' for estimator Root: 'k' is not a composite estimator"
        );

        let sub = EstimatorRef::new(Node::new("Leaf", vec![("k", 3.into())]));
        let mut root = Node::new("Root", vec![("sub", sub.into())]);
        let err = set_params(&mut root, vec![("sub__k__x__y".to_string(), 1.into())]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'x' for estimator Leaf: 'k' is not a composite estimator"
        );
    }

    #[test]
    fn test_nested_key_after_unbinding_its_prefix_is_invalid() {
        let old = leaf("Old", 1);
        let mut root = Node::new("Root", vec![("sub", old.clone().into())]);

        let err = set_params(
            &mut root,
            vec![
                ("sub".to_string(), Value::None),
                ("sub__alpha".to_string(), 5.into()),
            ],
        )
        .unwrap_err();

        assert!(matches!(
            err,
            EstimatorError::InvalidParameter { ref parameter, reason: Some(_), .. } if parameter == "alpha"
        ));
        assert_eq!(old.lock().get_param("alpha"), Some(Value::Int(1)));
    }

    #[test]
    fn test_cycle_is_detected_with_its_path() {
        let a = EstimatorRef::new(Node::new("A", vec![("child", Value::None)]));
        let b = EstimatorRef::new(Node::new("B", vec![("parent", a.clone().into())]));
        a.lock().set_param("child", b.into()).unwrap();

        let err = a.lock().get_params(true).unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::CyclicParameterGraph { ref path } if path == "child__parent"
        ));

        // Traversal state is cleaned up after the error.
        assert!(ANCESTORS.with(|stack| stack.borrow().is_empty()));

        // Break the cycle so the handles can be freed.
        a.lock().set_param("child", Value::None).unwrap();
    }

    #[test]
    fn test_shared_sub_estimator_is_not_a_cycle() {
        let shared = leaf("Shared", 1);
        let root = Node::new(
            "Root",
            vec![("left", shared.clone().into()), ("right", shared.into())],
        );
        let params = get_params(&root, true).unwrap();
        assert_eq!(params["left__alpha"], params["right__alpha"]);
    }
}
