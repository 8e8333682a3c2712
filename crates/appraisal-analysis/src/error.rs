//! Error types for analysis.

use appraisal_features::FeatureError;
use appraisal_model::InferenceError;
use thiserror::Error;

/// Errors raised while deriving analytics from a prediction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Livable area is zero, negative or not finite.
    #[error("Invalid area {area} for feature '{feature}': price per area is undefined")]
    InvalidArea {
        /// Area feature name
        feature: String,
        /// The offending value
        area: f64,
    },

    /// A feature named in the analysis is not in the schema.
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// Threshold configuration is inconsistent.
    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),

    /// Feature vector error.
    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    /// Inference error.
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),
}
