#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod artifact;
pub mod context;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod metadata;
pub mod stats;

pub use artifact::{ModelArtifact, load_estimator};
pub use context::{ArtifactPaths, ModelContext, SharedModel};
pub use engine::{InferenceEngine, PredictionResult};
pub use error::{ArtifactKind, InferenceError, ModelError};
pub use estimator::{
    Estimator, EstimatorError, FnEstimator, LinearEstimator, RegressionTree, TreeEnsemble,
    TreeNode,
};
pub use metadata::{
    FALLBACK_ERROR_MARGIN, FeatureImportance, FeatureMetadata, FeatureRange, MetadataSource,
    ModelStats,
};
pub use stats::ReferenceStatistics;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
