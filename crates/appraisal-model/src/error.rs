//! Error types for model loading and inference.

use crate::estimator::EstimatorError;
use appraisal_features::FeatureError;
use derive_more::Display;
use std::path::PathBuf;
use thiserror::Error;

/// Which artifact an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ArtifactKind {
    /// The serialized estimator
    #[display("model")]
    Model,
    /// The feature-metadata file
    #[display("feature metadata")]
    Metadata,
}

/// Errors raised while loading the model, its metadata or its statistics.
///
/// These are deployment errors: they are reported once at load time and are
/// never retried.
#[derive(Debug, Error)]
pub enum ModelError {
    /// An artifact file does not exist.
    #[error("Missing {kind} artifact: {}", path.display())]
    MissingArtifact {
        /// Which artifact
        kind: ArtifactKind,
        /// Where it was expected
        path: PathBuf,
    },

    /// An artifact exists but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// Artifact path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// An artifact is not valid JSON for its type.
    #[error("Failed to parse {kind} artifact {}: {source}", path.display())]
    Parse {
        /// Which artifact
        kind: ArtifactKind,
        /// Artifact path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },

    /// An artifact parsed but its content is inconsistent.
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    /// The feature schema could not be built.
    #[error("Schema error: {0}")]
    Schema(#[from] FeatureError),

    /// The estimator definition is invalid.
    #[error("Estimator error: {0}")]
    Estimator(#[from] EstimatorError),
}

/// Per-request inference errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    /// Vector length differs from the schema length.
    #[error("Shape mismatch: model expects {expected} features, got {actual}")]
    ShapeMismatch {
        /// Schema length
        expected: usize,
        /// Vector length
        actual: usize,
    },

    /// Vector was assembled for a differently ordered schema.
    #[error("Schema mismatch: vector was assembled for a different feature order")]
    SchemaMismatch,

    /// The estimator failed or produced a non-finite value.
    #[error("Inference failure: {0}")]
    InferenceFailure(String),
}
