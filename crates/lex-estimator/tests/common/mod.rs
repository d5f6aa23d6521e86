//! Native estimators shared by the integration tests.

#![allow(dead_code)]

use lex_estimator::{Args, Estimator, EstimatorError, EstimatorRef, ParamsMap, Value};

fn invalid(parameter: &str, estimator: &dyn Estimator) -> EstimatorError {
    EstimatorError::invalid_parameter(parameter, estimator.name())
}

fn number(parameter: &str, value: &Value, estimator: &dyn Estimator) -> Result<f64, EstimatorError> {
    value
        .as_f64()
        .ok_or_else(|| EstimatorError::invalid_value(parameter, estimator.name(), "a number"))
}

fn samples(args: &Args) -> Vec<f64> {
    args.get(0)
        .and_then(Value::as_list)
        .map(|items| items.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default()
}

// ============================================================================
// Scaler
// ============================================================================

/// Subtracts `mean` and divides by `scale`.
#[derive(Debug, Clone)]
pub struct Scaler {
    pub mean: f64,
    pub scale: f64,
    pub fitted: bool,
}

impl Scaler {
    pub fn new(mean: f64) -> Self {
        Self {
            mean,
            scale: 1.0,
            fitted: false,
        }
    }
}

impl Estimator for Scaler {
    fn param_names(&self) -> Vec<String> {
        vec!["mean".to_string(), "scale".to_string()]
    }

    fn get_param(&self, name: &str) -> Option<Value> {
        match name {
            "mean" => Some(Value::Float(self.mean)),
            "scale" => Some(Value::Float(self.scale)),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: Value) -> Result<(), EstimatorError> {
        match name {
            "mean" => self.mean = number(name, &value, self)?,
            "scale" => self.scale = number(name, &value, self)?,
            _ => return Err(invalid(name, self)),
        }
        Ok(())
    }

    fn clone_unfitted(&self) -> Result<EstimatorRef, EstimatorError> {
        Ok(EstimatorRef::new(Scaler {
            fitted: false,
            ..self.clone()
        }))
    }

    fn fit(&mut self, _args: &Args) -> Result<(), EstimatorError> {
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, args: &Args) -> Result<Value, EstimatorError> {
        Ok(Value::from(
            samples(args)
                .into_iter()
                .map(|x| (x - self.mean) / self.scale)
                .collect::<Vec<_>>(),
        ))
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Predicts the largest class for samples above `threshold`, the smallest
/// otherwise.
#[derive(Debug, Clone)]
pub struct ThresholdClassifier {
    pub c: f64,
    pub threshold: f64,
    pub classes: Option<Vec<i64>>,
}

impl ThresholdClassifier {
    pub fn new(c: f64) -> Self {
        Self {
            c,
            threshold: 0.0,
            classes: None,
        }
    }
}

impl Estimator for ThresholdClassifier {
    fn param_names(&self) -> Vec<String> {
        vec!["C".to_string(), "threshold".to_string()]
    }

    fn get_param(&self, name: &str) -> Option<Value> {
        match name {
            "C" => Some(Value::Float(self.c)),
            "threshold" => Some(Value::Float(self.threshold)),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: Value) -> Result<(), EstimatorError> {
        match name {
            "C" => self.c = number(name, &value, self)?,
            "threshold" => self.threshold = number(name, &value, self)?,
            _ => return Err(invalid(name, self)),
        }
        Ok(())
    }

    fn clone_unfitted(&self) -> Result<EstimatorRef, EstimatorError> {
        Ok(EstimatorRef::new(ThresholdClassifier {
            classes: None,
            ..self.clone()
        }))
    }

    fn is_classifier(&self) -> Result<bool, EstimatorError> {
        Ok(true)
    }

    fn classes(&self) -> Result<Option<Value>, EstimatorError> {
        Ok(self.classes.clone().map(Value::from))
    }

    fn fit(&mut self, args: &Args) -> Result<(), EstimatorError> {
        let mut classes: Vec<i64> = args
            .get(1)
            .and_then(Value::as_list)
            .map(|ys| ys.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default();
        classes.sort_unstable();
        classes.dedup();
        self.classes = Some(classes);
        Ok(())
    }

    fn predict(&self, args: &Args) -> Result<Value, EstimatorError> {
        let classes = self
            .classes
            .as_ref()
            .ok_or_else(|| EstimatorError::unsupported("predict", self.name()))?;
        let (low, high) = (
            classes.first().copied().unwrap_or_default(),
            classes.last().copied().unwrap_or_default(),
        );
        Ok(Value::from(
            samples(args)
                .into_iter()
                .map(|x| if x > self.threshold { high } else { low })
                .collect::<Vec<_>>(),
        ))
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Chains steps; every step but the last must transform.
#[derive(Debug)]
pub struct Pipeline {
    pub steps: Vec<(String, Value)>,
}

impl Pipeline {
    pub fn new(steps: Vec<(&str, impl Into<Value>)>) -> Self {
        Self {
            steps: steps
                .into_iter()
                .map(|(name, step)| (name.to_string(), step.into()))
                .collect(),
        }
    }

    fn step(&self, index: usize) -> Result<&EstimatorRef, EstimatorError> {
        self.steps
            .get(index)
            .and_then(|(_, step)| step.as_estimator())
            .ok_or_else(|| EstimatorError::unsupported("step", self.name()))
    }

    fn transform_all_but_last(&self, args: &Args) -> Result<Args, EstimatorError> {
        let mut current = args.clone();
        for index in 0..self.steps.len().saturating_sub(1) {
            let x = self.step(index)?.lock().transform(&current)?;
            current.positional[0] = x;
        }
        Ok(current)
    }

    fn last(&self) -> Result<&EstimatorRef, EstimatorError> {
        self.step(self.steps.len().saturating_sub(1))
    }
}

impl Estimator for Pipeline {
    fn param_names(&self) -> Vec<String> {
        self.steps.iter().map(|(name, _)| name.clone()).collect()
    }

    fn get_param(&self, name: &str) -> Option<Value> {
        self.steps
            .iter()
            .find(|(step, _)| step == name)
            .map(|(_, value)| value.clone())
    }

    fn set_param(&mut self, name: &str, value: Value) -> Result<(), EstimatorError> {
        match self.steps.iter_mut().find(|(step, _)| step == name) {
            Some((_, slot)) => {
                *slot = value;
                Ok(())
            }
            None => Err(invalid(name, self)),
        }
    }

    fn clone_unfitted(&self) -> Result<EstimatorRef, EstimatorError> {
        Ok(EstimatorRef::new(Pipeline {
            steps: self.steps.clone(),
        }))
    }

    fn is_classifier(&self) -> Result<bool, EstimatorError> {
        self.last()?.lock().is_classifier()
    }

    fn classes(&self) -> Result<Option<Value>, EstimatorError> {
        self.last()?.lock().classes()
    }

    fn fit(&mut self, args: &Args) -> Result<(), EstimatorError> {
        let mut current = args.clone();
        for index in 0..self.steps.len().saturating_sub(1) {
            let x = self.step(index)?.lock().fit_transform(&current)?;
            current.positional[0] = x;
        }
        self.last()?.lock().fit(&current)
    }

    fn predict(&self, args: &Args) -> Result<Value, EstimatorError> {
        let current = self.transform_all_but_last(args)?;
        self.last()?.lock().predict(&current)
    }
}

/// Parameters that are plain values, leaving out estimator handles, which
/// compare by identity.
pub fn scalar_params(params: &ParamsMap) -> ParamsMap {
    params
        .iter()
        .filter(|(_, value)| !matches!(value, Value::Estimator(_) | Value::Foreign(_)))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// `Pipeline { scaler: Scaler(mean=0), clf: ThresholdClassifier(C=1) }`.
pub fn scaler_and_classifier() -> (Pipeline, EstimatorRef, EstimatorRef) {
    let scaler = EstimatorRef::new(Scaler::new(0.0));
    let clf = EstimatorRef::new(ThresholdClassifier::new(1.0));
    let pipeline = Pipeline::new(vec![("scaler", scaler.clone()), ("clf", clf.clone())]);
    (pipeline, scaler, clf)
}
