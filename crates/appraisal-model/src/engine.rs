//! Inference Engine
//!
//! Wraps a loaded estimator together with the schema it was trained on.
//! Every prediction:
//!
//! 1. checks the vector length and feature order against the schema,
//! 2. runs the estimator, turning any fault (error, panic, non-finite output)
//!    into [`InferenceError::InferenceFailure`],
//! 3. floors the output at zero, since prices cannot be negative.

use crate::error::{InferenceError, ModelError};
use crate::estimator::Estimator;
use crate::metadata::MetadataSource;
use appraisal_features::{CanonicalVector, FeatureSchema};
use serde::Serialize;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Outcome of a single prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Estimated price in USD, never negative
    pub point_estimate: f64,
    /// ± margin in USD, carried from the model's reported error
    pub error_margin: f64,
    /// The vector the estimate was computed from
    pub input_vector: CanonicalVector,
    /// Metadata the engine was built from
    pub source: MetadataSource,
}

impl PredictionResult {
    /// Whether the estimate was produced with fallback metadata.
    pub const fn is_degraded(&self) -> bool {
        self.source.is_fallback()
    }
}

/// Validating wrapper around an [`Estimator`].
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    estimator: Arc<dyn Estimator>,
    schema: FeatureSchema,
    error_margin: f64,
    source: MetadataSource,
}

impl InferenceEngine {
    /// Create an engine.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidArtifact`] if the estimator declares an
    /// input length different from the schema length, or if the error margin
    /// is negative or not finite.
    pub fn new(
        estimator: Arc<dyn Estimator>,
        schema: FeatureSchema,
        error_margin: f64,
        source: MetadataSource,
    ) -> Result<Self, ModelError> {
        if let Some(expected) = estimator.input_len()
            && expected != schema.len()
        {
            return Err(ModelError::InvalidArtifact(format!(
                "{} estimator expects {expected} features, metadata declares {}",
                estimator.name(),
                schema.len()
            )));
        }
        if !error_margin.is_finite() || error_margin < 0.0 {
            return Err(ModelError::InvalidArtifact(format!(
                "error margin must be finite and non-negative, got {error_margin}"
            )));
        }
        Ok(Self {
            estimator,
            schema,
            error_margin,
            source,
        })
    }

    /// Schema the estimator was trained on.
    pub const fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Margin attached to every result.
    pub const fn error_margin(&self) -> f64 {
        self.error_margin
    }

    /// Metadata source attached to every result.
    pub const fn source(&self) -> &MetadataSource {
        &self.source
    }

    /// Backend name of the wrapped estimator.
    pub fn estimator_name(&self) -> &str {
        self.estimator.name()
    }

    /// Predict a price for `vector`.
    ///
    /// # Errors
    /// [`InferenceError::ShapeMismatch`] or [`InferenceError::SchemaMismatch`]
    /// if the vector was not built for this engine's schema, and
    /// [`InferenceError::InferenceFailure`] if the estimator faults.
    pub fn predict(&self, vector: &CanonicalVector) -> Result<PredictionResult, InferenceError> {
        let raw = self.raw_predict(vector)?;
        let point_estimate = if raw < 0.0 {
            log::debug!("Estimator returned {raw}; flooring at 0");
            0.0
        } else {
            raw
        };

        Ok(PredictionResult {
            point_estimate,
            error_margin: self.error_margin,
            input_vector: vector.clone(),
            source: self.source.clone(),
        })
    }

    /// Run the estimator without flooring the output.
    pub fn raw_predict(&self, vector: &CanonicalVector) -> Result<f64, InferenceError> {
        if vector.len() != self.schema.len() {
            log::error!(
                "Shape mismatch: schema has {} features, vector has {}",
                self.schema.len(),
                vector.len()
            );
            return Err(InferenceError::ShapeMismatch {
                expected: self.schema.len(),
                actual: vector.len(),
            });
        }
        if vector.fingerprint() != self.schema.fingerprint() {
            log::error!("Schema mismatch: vector was assembled for a different feature order");
            return Err(InferenceError::SchemaMismatch);
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| self.estimator.predict(vector.view())));
        let value = match outcome {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                log::error!("{} estimator failed: {e}", self.estimator.name());
                return Err(InferenceError::InferenceFailure(e.to_string()));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("{} estimator panicked: {message}", self.estimator.name());
                return Err(InferenceError::InferenceFailure(message));
            }
        };

        if !value.is_finite() {
            log::error!("{} estimator returned {value}", self.estimator.name());
            return Err(InferenceError::InferenceFailure(format!(
                "estimator returned a non-finite value ({value})"
            )));
        }
        Ok(value)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "estimator panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{EstimatorError, FnEstimator, LinearEstimator};
    use appraisal_features::{FeatureDescriptor, FeatureUnit};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn schema(names: &[&str]) -> FeatureSchema {
        FeatureSchema::new(
            names
                .iter()
                .map(|n| FeatureDescriptor::new(*n, *n, FeatureUnit::Scalar, -1e6, 1e6, 0.0).unwrap())
                .collect(),
        )
        .unwrap()
    }

    fn engine(estimator: impl Estimator + 'static, names: &[&str]) -> InferenceEngine {
        InferenceEngine::new(Arc::new(estimator), schema(names), 20_000.0, MetadataSource::Fallback).unwrap()
    }

    #[test]
    fn test_predict_carries_margin_and_vector() {
        let engine = engine(LinearEstimator::new(50_000.0, vec![100.0, 10_000.0]).unwrap(), &["a", "b"]);
        let vector = engine.schema().vector(vec![1500.0, 7.0]).unwrap();
        let result = engine.predict(&vector).unwrap();

        assert_eq!(result.point_estimate, 270_000.0);
        assert_eq!(result.error_margin, 20_000.0);
        assert_eq!(result.input_vector, vector);
        assert!(result.is_degraded());
    }

    #[test]
    fn test_negative_output_is_floored() {
        let engine = engine(LinearEstimator::new(-1e9, vec![1.0]).unwrap(), &["a"]);
        let vector = engine.schema().vector(vec![5.0]).unwrap();
        assert_eq!(engine.predict(&vector).unwrap().point_estimate, 0.0);
        assert_eq!(engine.raw_predict(&vector).unwrap(), -1e9 + 5.0);
    }

    #[test]
    fn test_output_never_negative() {
        let engine = engine(LinearEstimator::new(-50.0, vec![3.0, -7.0]).unwrap(), &["a", "b"]);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let vector = engine
                .schema()
                .vector(vec![rng.gen_range(-1e5..1e5), rng.gen_range(-1e5..1e5)])
                .unwrap();
            assert!(engine.predict(&vector).unwrap().point_estimate >= 0.0);
        }
    }

    #[test]
    fn test_shape_mismatch() {
        let engine = engine(FnEstimator::new(|x| Ok(x.sum())), &["a", "b"]);
        let other = schema(&["a"]);
        let vector = other.vector(vec![1.0]).unwrap();
        assert_eq!(
            engine.predict(&vector),
            Err(InferenceError::ShapeMismatch { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn test_schema_mismatch() {
        let engine = engine(FnEstimator::new(|x| Ok(x.sum())), &["quality", "area"]);
        let swapped = schema(&["area", "quality"]);
        let vector = swapped.vector(vec![1500.0, 7.0]).unwrap();
        assert_eq!(engine.predict(&vector), Err(InferenceError::SchemaMismatch));
    }

    #[test]
    fn test_estimator_faults_are_contained() {
        let failing = engine(
            FnEstimator::new(|_| Err(EstimatorError::Failed("booster corrupted".into()))),
            &["a"],
        );
        let vector = failing.schema().vector(vec![1.0]).unwrap();
        assert!(matches!(failing.predict(&vector), Err(InferenceError::InferenceFailure(m)) if m.contains("booster")));

        let panicking = engine(FnEstimator::new(|_| panic!("index out of bounds")), &["a"]);
        let vector = panicking.schema().vector(vec![1.0]).unwrap();
        assert!(matches!(panicking.predict(&vector), Err(InferenceError::InferenceFailure(m)) if m.contains("index")));

        let nan = engine(FnEstimator::new(|_| Ok(f64::NAN)), &["a"]);
        let vector = nan.schema().vector(vec![1.0]).unwrap();
        assert!(matches!(nan.predict(&vector), Err(InferenceError::InferenceFailure(_))));
    }

    #[test]
    fn test_estimator_length_must_match_schema() {
        let result = InferenceEngine::new(
            Arc::new(LinearEstimator::new(0.0, vec![1.0, 2.0, 3.0]).unwrap()),
            schema(&["a", "b"]),
            0.0,
            MetadataSource::Fallback,
        );
        assert!(matches!(result, Err(ModelError::InvalidArtifact(_))));
    }
}
