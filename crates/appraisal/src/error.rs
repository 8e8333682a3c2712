//! Umbrella error type.

use crate::export::ExportError;
use appraisal_analysis::AnalysisError;
use appraisal_features::FeatureError;
use appraisal_model::{InferenceError, ModelError};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced to callers of the appraisal pipeline.
#[derive(Debug, Error)]
pub enum AppraisalError {
    /// The model could not be loaded; no prediction can be made.
    #[error("Prediction unavailable: {0}")]
    Unavailable(Arc<ModelError>),

    /// Model or metadata loading error.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Input rejected or inconsistent with the schema.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// The estimator failed for this request.
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// Analysis setup error.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    ConfigIo {
        /// Config path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON.
    #[error("Failed to parse config {}: {source}", path.display())]
    ConfigParse {
        /// Config path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },

    /// Export failed.
    #[error(transparent)]
    Export(#[from] ExportError),
}
