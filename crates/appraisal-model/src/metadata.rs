//! Feature Metadata
//!
//! The metadata artifact published alongside a trained model:
//!
//! ```json
//! {
//!   "feature_names": ["GrLivArea", "TotalBsmtSF", "OverallQual"],
//!   "feature_ranges": { "GrLivArea": { "min": 334.0, "max": 5642.0 } },
//!   "model_stats": { "test_r2": 0.89, "rmse_score": 26000.0, "train_samples": 1168,
//!                    "mean_price": 180921.0, "min_price": 34900.0, "max_price": 755000.0 },
//!   "feature_importance": [{ "feature": "OverallQual", "importance": 0.41 }]
//! }
//! ```
//!
//! `feature_names` is the only source of feature order. When the artifact is
//! missing, [`FeatureMetadata::fallback`] builds a value of the same shape from
//! a caller-provided order and the housing catalog, and the result is tagged
//! [`MetadataSource::Fallback`].

use crate::artifact::read_artifact;
use crate::error::{ArtifactKind, ModelError};
use crate::stats::ReferenceStatistics;
use appraisal_features::{FeatureDescriptor, FeatureSchema, FeatureUnit, catalog_entry, normalize_key};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Margin used when the metadata reports no error metric.
pub const FALLBACK_ERROR_MARGIN: f64 = 15_000.0;

/// Mean price of the reference population used in degraded mode.
pub const FALLBACK_MEAN_PRICE: f64 = 180_921.0;

/// Lowest price of the reference population used in degraded mode.
pub const FALLBACK_MIN_PRICE: f64 = 34_900.0;

/// Highest price of the reference population used in degraded mode.
pub const FALLBACK_MAX_PRICE: f64 = 755_000.0;

/// Sample count of the reference population used in degraded mode.
pub const FALLBACK_SAMPLE_COUNT: u64 = 1_460;

/// Where the metadata in use came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Display)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetadataSource {
    /// Read from the metadata artifact
    #[display("loaded from {}", path.display())]
    Loaded {
        /// Artifact path
        path: PathBuf,
    },
    /// Artifact missing; built-in defaults in use
    #[display("fallback defaults")]
    Fallback,
}

impl MetadataSource {
    /// Whether results computed with this metadata are degraded.
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }
}

/// Observed training range of one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRange {
    /// Lowest observed value
    pub min: f64,
    /// Highest observed value
    pub max: f64,
}

/// Training and evaluation statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    /// R² on the held-out set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_r2: Option<f64>,
    /// Root-mean-square error on the held-out set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rmse_score: Option<f64>,
    /// Mean absolute error on the held-out set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mae_score: Option<f64>,
    /// Number of training samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_samples: Option<u64>,
    /// Mean sale price
    pub mean_price: f64,
    /// Lowest sale price (the mean when not reported)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    /// Highest sale price (the mean when not reported)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
}

impl ModelStats {
    /// Statistics of the reference housing population.
    pub const fn fallback() -> Self {
        Self {
            test_r2: None,
            rmse_score: None,
            mae_score: None,
            train_samples: Some(FALLBACK_SAMPLE_COUNT),
            mean_price: FALLBACK_MEAN_PRICE,
            min_price: Some(FALLBACK_MIN_PRICE),
            max_price: Some(FALLBACK_MAX_PRICE),
        }
    }
}

/// Importance of one feature in the trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// Feature name
    pub feature: String,
    /// Relative importance
    pub importance: f64,
}

/// Content of the feature-metadata artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMetadata {
    /// Feature names in training order
    pub feature_names: Vec<String>,
    /// Observed training range per feature
    #[serde(default)]
    pub feature_ranges: BTreeMap<String, FeatureRange>,
    /// Training and evaluation statistics
    pub model_stats: ModelStats,
    /// Legacy location of the RMSE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rmse_score: Option<f64>,
    /// Feature importances as reported by the trainer
    #[serde(default)]
    pub feature_importance: Vec<FeatureImportance>,
    /// Per-feature default values
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_defaults: BTreeMap<String, f64>,
}

impl FeatureMetadata {
    /// Parse metadata from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load the metadata artifact.
    ///
    /// # Errors
    /// [`ModelError::MissingArtifact`] if the file does not exist, otherwise
    /// I/O and parse errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let text = read_artifact(path, ArtifactKind::Metadata)?;
        let metadata = Self::from_json(&text).map_err(|source| ModelError::Parse {
            kind: ArtifactKind::Metadata,
            path: path.to_path_buf(),
            source,
        })?;
        log::info!(
            "Loaded metadata for {} features from {}",
            metadata.feature_names.len(),
            path.display()
        );
        Ok(metadata)
    }

    /// Load the metadata artifact, or build fallback metadata from
    /// `fallback_order` if the file does not exist.
    ///
    /// Any other failure (unreadable or malformed file) is returned as is.
    pub fn load_or_fallback<S: AsRef<str>>(
        path: impl AsRef<Path>,
        fallback_order: &[S],
    ) -> Result<(Self, MetadataSource), ModelError> {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(metadata) => Ok((
                metadata,
                MetadataSource::Loaded {
                    path: path.to_path_buf(),
                },
            )),
            Err(ModelError::MissingArtifact { .. }) => {
                log::warn!(
                    "Metadata artifact {} not found; using fallback defaults",
                    path.display()
                );
                Ok((Self::fallback(fallback_order), MetadataSource::Fallback))
            }
            Err(e) => Err(e),
        }
    }

    /// In-memory metadata with the artifact's shape, for degraded mode.
    pub fn fallback<S: AsRef<str>>(feature_order: &[S]) -> Self {
        let feature_names: Vec<String> = feature_order
            .iter()
            .map(|name| name.as_ref().to_string())
            .collect();
        let feature_ranges = feature_names
            .iter()
            .filter_map(|name| {
                catalog_entry(name).map(|entry| {
                    (
                        name.clone(),
                        FeatureRange {
                            min: entry.valid_min,
                            max: entry.valid_max,
                        },
                    )
                })
            })
            .collect();

        Self {
            feature_names,
            feature_ranges,
            model_stats: ModelStats::fallback(),
            rmse_score: None,
            feature_importance: Vec::new(),
            feature_defaults: BTreeMap::new(),
        }
    }

    /// Error margin: RMSE, else MAE, else [`FALLBACK_ERROR_MARGIN`].
    pub fn error_margin(&self) -> f64 {
        self.model_stats
            .rmse_score
            .or(self.rmse_score)
            .or(self.model_stats.mae_score)
            .unwrap_or(FALLBACK_ERROR_MARGIN)
    }

    /// Validated reference statistics.
    pub fn reference_statistics(&self) -> Result<ReferenceStatistics, ModelError> {
        let stats = &self.model_stats;
        ReferenceStatistics::new(
            stats.mean_price,
            stats.min_price.unwrap_or(stats.mean_price),
            stats.max_price.unwrap_or(stats.mean_price),
            stats.train_samples.unwrap_or(0),
            self.error_margin(),
        )
    }

    /// Build the feature schema in `feature_names` order.
    ///
    /// Catalog features use the metadata range when one is given; features
    /// unknown to the catalog require a range.
    pub fn to_schema(&self) -> Result<FeatureSchema, ModelError> {
        let descriptors = self
            .feature_names
            .iter()
            .map(|name| self.descriptor(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FeatureSchema::new(descriptors)?)
    }

    fn descriptor(&self, name: &str) -> Result<FeatureDescriptor, ModelError> {
        let range = self.feature_ranges.get(name);
        let mut descriptor = match (catalog_entry(name).filter(|e| e.name == name), range) {
            (Some(entry), Some(range)) => entry.descriptor_with_range(range.min, range.max),
            (Some(entry), None) => entry.descriptor(),
            (None, Some(range)) => {
                log::warn!("Feature '{name}' is not in the housing catalog; treating it as a scalar");
                FeatureDescriptor {
                    name: name.to_string(),
                    attribute: normalize_key(name),
                    aliases: Vec::new(),
                    unit: FeatureUnit::Scalar,
                    valid_min: range.min,
                    valid_max: range.max,
                    default: (range.min + range.max) / 2.0,
                }
            }
            (None, None) => {
                return Err(ModelError::InvalidArtifact(format!(
                    "feature '{name}' is unknown and has no range"
                )));
            }
        };
        if let Some(default) = self.feature_defaults.get(name) {
            descriptor.default = *default;
        }
        Ok(descriptor)
    }

    /// The `n` most important features, most important first.
    pub fn top_features(&self, n: usize) -> Vec<FeatureImportance> {
        let mut ranked = self.feature_importance.clone();
        ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        ranked.truncate(n);
        ranked
    }
}
