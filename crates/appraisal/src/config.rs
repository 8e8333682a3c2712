//! Configuration
//!
//! Everything tunable about the pipeline lives in [`AppraisalConfig`], which
//! loads from JSON with every field optional:
//!
//! ```json
//! {
//!   "artifacts": { "model": "model.json", "metadata": "feature_info.json" },
//!   "area_attribute": "living_area",
//!   "eur_per_usd": 0.85,
//!   "comparison": { "market": { "premium": 0.2, "above_average": 0.0 } }
//! }
//! ```

use crate::error::AppraisalError;
use appraisal_analysis::{ComparisonConfig, Perturbation};
use appraisal_features::{ExchangeRate, FeatureSchema};
use appraisal_model::ArtifactPaths;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Feature order assumed when the metadata artifact is missing.
pub fn default_feature_order() -> Vec<String> {
    [
        "GrLivArea",
        "TotalBsmtSF",
        "OverallQual",
        "GarageCars",
        "GarageArea",
        "YearBuilt",
        "FullBath",
        "TotRmsAbvGrd",
        "Fireplaces",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppraisalConfig {
    /// Artifact locations
    pub artifacts: ArtifactPaths,
    /// Feature order used only when the metadata artifact is missing
    pub fallback_feature_order: Vec<String>,
    /// Feature (name, attribute or alias) holding the living area
    pub area_attribute: String,
    /// Euros per US dollar
    pub eur_per_usd: f64,
    /// Market comparison thresholds
    pub comparison: ComparisonConfig,
    /// What-if set; the standard set when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perturbations: Option<Vec<Perturbation>>,
}

impl Default for AppraisalConfig {
    fn default() -> Self {
        Self {
            artifacts: ArtifactPaths::default(),
            fallback_feature_order: default_feature_order(),
            area_attribute: "living_area".to_string(),
            eur_per_usd: 0.85,
            comparison: ComparisonConfig::default(),
            perturbations: None,
        }
    }
}

impl AppraisalConfig {
    /// Parse and validate a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, AppraisalError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AppraisalError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppraisalError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| AppraisalError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| AppraisalError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check the configuration invariants.
    pub fn validate(&self) -> Result<(), AppraisalError> {
        if self.fallback_feature_order.is_empty() {
            return Err(AppraisalError::Config(
                "fallback_feature_order cannot be empty".to_string(),
            ));
        }
        if self.area_attribute.trim().is_empty() {
            return Err(AppraisalError::Config(
                "area_attribute cannot be empty".to_string(),
            ));
        }
        self.exchange_rate()?;
        self.comparison.validate()?;
        Ok(())
    }

    /// The configured EUR/USD rate.
    pub fn exchange_rate(&self) -> Result<ExchangeRate, AppraisalError> {
        ExchangeRate::new(self.eur_per_usd).map_err(|e| AppraisalError::Config(e.to_string()))
    }

    /// What-if set for `schema`: the configured list, or the standard set.
    pub fn perturbations_for(&self, schema: &FeatureSchema) -> Vec<Perturbation> {
        match &self.perturbations {
            Some(list) => list.clone(),
            None => Perturbation::standard(schema),
        }
    }
}
