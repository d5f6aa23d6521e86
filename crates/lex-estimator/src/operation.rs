//! The fixed table of dispatchable operations.
//!
//! Every operation of the estimator capability set has a native spelling
//! (the name used by Rust callers) and a foreign spelling (the method name
//! called on a foreign object). The table is static data: it is built into
//! the binary and never changes at runtime.
//!
//! | Native | Foreign | Mutates |
//! |--------|---------|---------|
//! | `fit!` | `fit` | yes |
//! | `partial_fit!` | `partial_fit` | yes |
//! | `fit_transform!` | `fit_transform` | yes |
//! | `set_params!` | `set_params` | yes |
//! | `predict` | `predict` | no |
//! | `predict_proba` | `predict_proba` | no |
//! | `predict_log_proba` | `predict_log_proba` | no |
//! | `transform` | `transform` | no |
//! | `inverse_transform` | `inverse_transform` | no |
//! | `decision_function` | `decision_function` | no |
//! | `score_samples` | `score_samples` | no |
//! | `sample` | `sample` | no |
//! | `score` | `score` | no |
//! | `get_feature_names` | `get_feature_names` | no |
//! | `get_params` | `get_params` | no |
//!
//! Native spellings of mutating operations carry a trailing `!`; the lookup
//! also accepts them without it, matching the Rust method names.

use crate::error::EstimatorError;
use std::fmt;
use std::str::FromStr;

/// An operation of the estimator capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Fit,
    PartialFit,
    FitTransform,
    SetParams,
    Predict,
    PredictProba,
    PredictLogProba,
    Transform,
    InverseTransform,
    DecisionFunction,
    ScoreSamples,
    Sample,
    Score,
    GetFeatureNames,
    GetParams,
}

/// `(operation, native name, foreign name)` for every supported operation.
const TABLE: [(Operation, &str, &str); 15] = [
    (Operation::Fit, "fit!", "fit"),
    (Operation::PartialFit, "partial_fit!", "partial_fit"),
    (Operation::FitTransform, "fit_transform!", "fit_transform"),
    (Operation::SetParams, "set_params!", "set_params"),
    (Operation::Predict, "predict", "predict"),
    (Operation::PredictProba, "predict_proba", "predict_proba"),
    (Operation::PredictLogProba, "predict_log_proba", "predict_log_proba"),
    (Operation::Transform, "transform", "transform"),
    (Operation::InverseTransform, "inverse_transform", "inverse_transform"),
    (Operation::DecisionFunction, "decision_function", "decision_function"),
    (Operation::ScoreSamples, "score_samples", "score_samples"),
    (Operation::Sample, "sample", "sample"),
    (Operation::Score, "score", "score"),
    (Operation::GetFeatureNames, "get_feature_names", "get_feature_names"),
    (Operation::GetParams, "get_params", "get_params"),
];

impl Operation {
    /// All operations, in table order.
    pub fn all() -> impl Iterator<Item = Operation> {
        TABLE.iter().map(|(op, _, _)| *op)
    }

    fn entry(self) -> &'static (Operation, &'static str, &'static str) {
        // Table order matches declaration order.
        &TABLE[self as usize]
    }

    /// Native spelling of the operation.
    #[must_use]
    pub fn native_name(self) -> &'static str {
        self.entry().1
    }

    /// Method name called on a foreign object.
    #[must_use]
    pub fn foreign_name(self) -> &'static str {
        self.entry().2
    }

    /// Whether the operation mutates the estimator it is called on.
    #[must_use]
    pub fn is_mutating(self) -> bool {
        self.native_name().ends_with('!')
    }

    /// Resolve a native spelling. The trailing `!` is optional.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError::UnknownOperation`] for names outside the table.
    pub fn from_native_name(name: &str) -> Result<Self, EstimatorError> {
        let bare = name.strip_suffix('!').unwrap_or(name);
        TABLE
            .iter()
            .find(|(_, native, _)| native.strip_suffix('!').unwrap_or(native) == bare)
            .map(|(op, _, _)| *op)
            .ok_or_else(|| EstimatorError::UnknownOperation(name.to_string()))
    }

    /// Resolve a foreign method name.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError::UnknownOperation`] for names outside the table.
    pub fn from_foreign_name(name: &str) -> Result<Self, EstimatorError> {
        TABLE
            .iter()
            .find(|(_, _, foreign)| *foreign == name)
            .map(|(op, _, _)| *op)
            .ok_or_else(|| EstimatorError::UnknownOperation(name.to_string()))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.native_name())
    }
}

impl FromStr for Operation {
    type Err = EstimatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_native_name(s)
    }
}
