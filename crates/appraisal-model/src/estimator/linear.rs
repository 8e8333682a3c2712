//! Linear regression estimator
//!
//! prediction = intercept + Σ coefficient_i × x_i

use super::{Estimator, EstimatorError};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Linear model with an intercept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LinearSpec", into = "LinearSpec")]
pub struct LinearEstimator {
    intercept: f64,
    coefficients: Array1<f64>,
}

#[derive(Serialize, Deserialize)]
struct LinearSpec {
    #[serde(default)]
    intercept: f64,
    coefficients: Vec<f64>,
}

impl TryFrom<LinearSpec> for LinearEstimator {
    type Error = EstimatorError;

    fn try_from(spec: LinearSpec) -> Result<Self, Self::Error> {
        Self::new(spec.intercept, spec.coefficients)
    }
}

impl From<LinearEstimator> for LinearSpec {
    fn from(model: LinearEstimator) -> Self {
        Self {
            intercept: model.intercept,
            coefficients: model.coefficients.to_vec(),
        }
    }
}

impl LinearEstimator {
    /// Create a linear model.
    ///
    /// # Errors
    /// Returns [`EstimatorError::InvalidModel`] if there are no coefficients
    /// or any parameter is not finite.
    pub fn new(intercept: f64, coefficients: Vec<f64>) -> Result<Self, EstimatorError> {
        if coefficients.is_empty() {
            return Err(EstimatorError::InvalidModel(
                "linear model needs at least one coefficient".to_string(),
            ));
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(EstimatorError::InvalidModel(
                "linear model parameters must be finite".to_string(),
            ));
        }
        Ok(Self {
            intercept,
            coefficients: Array1::from(coefficients),
        })
    }

    /// Intercept term.
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Coefficients in input order.
    pub const fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }
}

impl Estimator for LinearEstimator {
    fn predict(&self, features: ArrayView1<'_, f64>) -> Result<f64, EstimatorError> {
        if features.len() != self.coefficients.len() {
            return Err(EstimatorError::InvalidInput {
                expected: self.coefficients.len(),
                actual: features.len(),
            });
        }
        Ok(self.intercept + self.coefficients.dot(&features))
    }

    fn input_len(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn name(&self) -> &str {
        "linear"
    }
}
