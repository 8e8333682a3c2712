//! Estimator backends
//!
//! A trained regression model is only ever used through one capability:
//! given an ordered numeric vector, return a numeric prediction. Any backend
//! implementing [`Estimator`] can be plugged into the inference engine.

pub mod linear;
pub mod tree;

pub use linear::LinearEstimator;
pub use tree::{RegressionTree, TreeEnsemble, TreeNode};

use ndarray::ArrayView1;
use std::fmt;
use thiserror::Error;

/// Errors raised by estimator backends.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    /// Input vector does not fit the estimator.
    #[error("Invalid input: expected {expected} values, got {actual}")]
    InvalidInput {
        /// Number of inputs the estimator was trained on
        expected: usize,
        /// Number of inputs received
        actual: usize,
    },

    /// Estimator definition is inconsistent.
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Estimator failed while predicting.
    #[error("Prediction failed: {0}")]
    Failed(String),
}

/// Trait for trained regression models
pub trait Estimator: Send + Sync + fmt::Debug {
    /// Predict a value from an ordered feature vector
    ///
    /// # Arguments
    /// * `features` - Feature values in training order, native units
    fn predict(&self, features: ArrayView1<'_, f64>) -> Result<f64, EstimatorError>;

    /// Number of inputs the estimator was trained on, when known
    ///
    /// Default implementation reports no constraint.
    fn input_len(&self) -> Option<usize> {
        None
    }

    /// Short backend name for logs
    fn name(&self) -> &str {
        "custom"
    }
}

type PredictFn = dyn Fn(ArrayView1<'_, f64>) -> Result<f64, EstimatorError> + Send + Sync;

/// Estimator backed by a closure.
pub struct FnEstimator {
    predict: Box<PredictFn>,
    input_len: Option<usize>,
    name: String,
}

impl FnEstimator {
    /// Wrap a prediction closure.
    pub fn new<F>(predict: F) -> Self
    where
        F: Fn(ArrayView1<'_, f64>) -> Result<f64, EstimatorError> + Send + Sync + 'static,
    {
        Self {
            predict: Box::new(predict),
            input_len: None,
            name: "fn".to_string(),
        }
    }

    /// Declare the expected input length.
    pub const fn with_input_len(mut self, len: usize) -> Self {
        self.input_len = Some(len);
        self
    }

    /// Name the backend in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl fmt::Debug for FnEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEstimator")
            .field("name", &self.name)
            .field("input_len", &self.input_len)
            .finish_non_exhaustive()
    }
}

impl Estimator for FnEstimator {
    fn predict(&self, features: ArrayView1<'_, f64>) -> Result<f64, EstimatorError> {
        if let Some(expected) = self.input_len
            && features.len() != expected
        {
            return Err(EstimatorError::InvalidInput {
                expected,
                actual: features.len(),
            });
        }
        (self.predict)(features)
    }

    fn input_len(&self) -> Option<usize> {
        self.input_len
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fn_estimator() {
        let estimator = FnEstimator::new(|x| Ok(x.sum())).with_input_len(3);
        assert_eq!(estimator.predict(array![1.0, 2.0, 3.0].view()).unwrap(), 6.0);
        assert_eq!(estimator.input_len(), Some(3));
        assert!(matches!(
            estimator.predict(array![1.0].view()),
            Err(EstimatorError::InvalidInput { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn test_fn_estimator_debug_names_backend() {
        let estimator = FnEstimator::new(|_| Ok(0.0)).with_name("stub");
        assert!(format!("{estimator:?}").contains("stub"));
        assert_eq!(estimator.name(), "stub");
    }
}
