//! Market Comparison
//!
//! Positions an estimate against the training population:
//!
//! - relative_difference = (estimate − mean) / mean
//! - absolute_difference = estimate − mean
//! - range_position = (estimate − min) / (max − min), clamped to [0, 1]
//! - price per area = estimate / living area (per sq ft and per m²)
//! - confidence band = [estimate − margin, estimate + margin]
//!
//! Category and efficiency labels come from [`ComparisonConfig`] thresholds
//! only.

use crate::error::AnalysisError;
use appraisal_features::{FeatureSchema, SQFT_PER_SQM};
use appraisal_model::{PredictionResult, ReferenceStatistics};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Thresholds on `relative_difference` for the market category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketThresholds {
    /// Above this the estimate is premium
    pub premium: f64,
    /// Above this (and up to `premium`) the estimate is above average
    pub above_average: f64,
}

impl Default for MarketThresholds {
    fn default() -> Self {
        Self {
            premium: 0.20,
            above_average: 0.0,
        }
    }
}

impl MarketThresholds {
    /// Check that thresholds are finite and ordered.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.premium.is_finite() && self.above_average.is_finite()) {
            return Err(AnalysisError::InvalidThresholds(
                "market thresholds must be finite".to_string(),
            ));
        }
        if self.above_average > self.premium {
            return Err(AnalysisError::InvalidThresholds(format!(
                "above_average ({}) exceeds premium ({})",
                self.above_average, self.premium
            )));
        }
        Ok(())
    }

    /// Category of a relative difference.
    pub fn categorize(&self, relative_difference: f64) -> MarketCategory {
        if relative_difference > self.premium {
            MarketCategory::Premium
        } else if relative_difference > self.above_average {
            MarketCategory::AboveAverage
        } else {
            MarketCategory::Value
        }
    }
}

/// Thresholds on the price per square metre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficiencyThresholds {
    /// Below this the price per m² is excellent
    pub excellent_below: f64,
    /// Below this the price per m² is good
    pub good_below: f64,
}

impl Default for EfficiencyThresholds {
    fn default() -> Self {
        Self {
            excellent_below: 1500.0,
            good_below: 2000.0,
        }
    }
}

impl EfficiencyThresholds {
    /// Check that thresholds are positive and ordered.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.excellent_below.is_finite() && self.good_below.is_finite()) {
            return Err(AnalysisError::InvalidThresholds(
                "efficiency thresholds must be finite".to_string(),
            ));
        }
        if self.excellent_below <= 0.0 || self.excellent_below > self.good_below {
            return Err(AnalysisError::InvalidThresholds(format!(
                "expected 0 < excellent_below ({}) <= good_below ({})",
                self.excellent_below, self.good_below
            )));
        }
        Ok(())
    }

    /// Efficiency of a price per m².
    pub fn rate(&self, price_per_sqm: f64) -> AreaEfficiency {
        if price_per_sqm < self.excellent_below {
            AreaEfficiency::Excellent
        } else if price_per_sqm < self.good_below {
            AreaEfficiency::Good
        } else {
            AreaEfficiency::High
        }
    }
}

/// Comparison configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Market category thresholds
    pub market: MarketThresholds,
    /// Price-per-area thresholds
    pub efficiency: EfficiencyThresholds,
}

impl ComparisonConfig {
    /// Validate both threshold sets.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.market.validate()?;
        self.efficiency.validate()
    }
}

/// Market position of an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum MarketCategory {
    /// Well above the mean price
    #[display("premium")]
    Premium,
    /// Above the mean price
    #[display("above average")]
    AboveAverage,
    /// At or below the mean price
    #[display("good value")]
    Value,
}

/// Price-per-area rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum AreaEfficiency {
    /// Low price per m²
    #[display("excellent")]
    Excellent,
    /// Moderate price per m²
    #[display("good")]
    Good,
    /// High price per m²
    #[display("high")]
    High,
}

/// Estimate ± error margin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    /// estimate − margin
    pub lower: f64,
    /// estimate + margin
    pub upper: f64,
}

impl ConfidenceBand {
    /// Band around `estimate`.
    pub fn around(estimate: f64, margin: f64) -> Self {
        Self {
            lower: estimate - margin,
            upper: estimate + margin,
        }
    }

    /// Band width.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Derived market metrics for one prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonMetrics {
    /// (estimate − mean) / mean
    pub relative_difference: f64,
    /// estimate − mean
    pub absolute_difference: f64,
    /// Position within [min, max] of the reference prices
    pub range_position: f64,
    /// Living area used, sq ft
    pub living_area_sqft: f64,
    /// USD per sq ft
    pub price_per_sqft: f64,
    /// USD per m²
    pub price_per_sqm: f64,
    /// Estimate ± margin
    pub confidence_band: ConfidenceBand,
    /// Market category
    pub category: MarketCategory,
    /// Price-per-area rating
    pub efficiency: AreaEfficiency,
}

/// Compares predictions with reference statistics.
#[derive(Debug, Clone)]
pub struct MarketComparator {
    area_feature: String,
    area_index: usize,
    config: ComparisonConfig,
}

impl MarketComparator {
    /// Create a comparator reading the living area from `area_feature`
    /// (feature name, attribute or alias).
    ///
    /// # Errors
    /// [`AnalysisError::UnknownFeature`] if the schema has no such feature,
    /// [`AnalysisError::InvalidThresholds`] if the configuration is invalid.
    pub fn new(schema: &FeatureSchema, area_feature: &str, config: ComparisonConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let area_index = schema
            .find(area_feature)
            .ok_or_else(|| AnalysisError::UnknownFeature(area_feature.to_string()))?;
        Ok(Self {
            area_feature: schema.features()[area_index].name.clone(),
            area_index,
            config,
        })
    }

    /// Feature the living area is read from.
    pub fn area_feature(&self) -> &str {
        &self.area_feature
    }

    /// Active configuration.
    pub const fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// Derive market metrics.
    ///
    /// # Errors
    /// [`AnalysisError::InvalidArea`] if the living area in the prediction's
    /// input vector is zero, negative or not finite.
    pub fn compare(
        &self,
        result: &PredictionResult,
        stats: &ReferenceStatistics,
    ) -> Result<ComparisonMetrics, AnalysisError> {
        let area = result
            .input_vector
            .get(self.area_index)
            .ok_or_else(|| AnalysisError::UnknownFeature(self.area_feature.clone()))?;
        if !area.is_finite() || area <= 0.0 {
            return Err(AnalysisError::InvalidArea {
                feature: self.area_feature.clone(),
                area,
            });
        }

        let estimate = result.point_estimate;
        let relative_difference = (estimate - stats.mean_price) / stats.mean_price;
        let range = stats.price_range();
        let range_position = if range > 0.0 {
            ((estimate - stats.min_price) / range).clamp(0.0, 1.0)
        } else {
            0.5
        };
        let price_per_sqft = estimate / area;
        let price_per_sqm = price_per_sqft * SQFT_PER_SQM;

        Ok(ComparisonMetrics {
            relative_difference,
            absolute_difference: estimate - stats.mean_price,
            range_position,
            living_area_sqft: area,
            price_per_sqft,
            price_per_sqm,
            confidence_band: ConfidenceBand::around(estimate, result.error_margin),
            category: self.config.market.categorize(relative_difference),
            efficiency: self.config.efficiency.rate(price_per_sqm),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appraisal_features::{FeatureDescriptor, FeatureUnit};
    use appraisal_model::MetadataSource;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec![
            FeatureDescriptor::new("OverallQual", "quality", FeatureUnit::Scalar, 1.0, 10.0, 5.0).unwrap(),
            FeatureDescriptor::new("GrLivArea", "living_area", FeatureUnit::Area, 0.0, 5000.0, 1500.0).unwrap(),
        ])
        .unwrap()
    }

    fn stats() -> ReferenceStatistics {
        ReferenceStatistics::new(200_000.0, 50_000.0, 650_000.0, 1000, 25_000.0).unwrap()
    }

    fn result(estimate: f64, area: f64) -> PredictionResult {
        PredictionResult {
            point_estimate: estimate,
            error_margin: 25_000.0,
            input_vector: schema().vector(vec![7.0, area]).unwrap(),
            source: MetadataSource::Fallback,
        }
    }

    fn comparator() -> MarketComparator {
        MarketComparator::new(&schema(), "living_area", ComparisonConfig::default()).unwrap()
    }

    #[test]
    fn test_relative_difference() {
        let metrics = comparator().compare(&result(300_000.0, 2000.0), &stats()).unwrap();
        assert_relative_eq!(metrics.relative_difference, 0.5);
        assert_relative_eq!(metrics.absolute_difference, 100_000.0);
        assert_eq!(metrics.category, MarketCategory::Premium);
    }

    #[test]
    fn test_price_per_area_and_band() {
        let metrics = comparator().compare(&result(300_000.0, 2000.0), &stats()).unwrap();
        assert_relative_eq!(metrics.price_per_sqft, 150.0);
        assert_relative_eq!(metrics.price_per_sqm, 1614.6, epsilon = 1e-9);
        assert_eq!(metrics.efficiency, AreaEfficiency::Good);
        assert_eq!(metrics.confidence_band, ConfidenceBand { lower: 275_000.0, upper: 325_000.0 });
        assert_relative_eq!(metrics.range_position, 250_000.0 / 600_000.0);
    }

    #[test]
    fn test_zero_area_is_invalid() {
        let err = comparator().compare(&result(300_000.0, 0.0), &stats()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidArea { area, .. } if area == 0.0));
    }

    #[test]
    fn test_unknown_area_feature() {
        let err = MarketComparator::new(&schema(), "lot_area", ComparisonConfig::default()).unwrap_err();
        assert_eq!(err, AnalysisError::UnknownFeature("lot_area".to_string()));
    }

    #[rstest]
    #[case(0.5, MarketCategory::Premium)]
    #[case(0.2, MarketCategory::AboveAverage)]
    #[case(0.01, MarketCategory::AboveAverage)]
    #[case(0.0, MarketCategory::Value)]
    #[case(-0.3, MarketCategory::Value)]
    fn test_categories(#[case] relative: f64, #[case] expected: MarketCategory) {
        assert_eq!(MarketThresholds::default().categorize(relative), expected);
    }

    #[rstest]
    #[case(1000.0, AreaEfficiency::Excellent)]
    #[case(1500.0, AreaEfficiency::Good)]
    #[case(1999.0, AreaEfficiency::Good)]
    #[case(2000.0, AreaEfficiency::High)]
    fn test_efficiency(#[case] price_per_sqm: f64, #[case] expected: AreaEfficiency) {
        assert_eq!(EfficiencyThresholds::default().rate(price_per_sqm), expected);
    }

    #[test]
    fn test_range_position_is_clamped() {
        let metrics = comparator().compare(&result(900_000.0, 2000.0), &stats()).unwrap();
        assert_eq!(metrics.range_position, 1.0);

        let flat = ReferenceStatistics::new(100.0, 100.0, 100.0, 1, 0.0).unwrap();
        let metrics = comparator().compare(&result(150.0, 2000.0), &flat).unwrap();
        assert_eq!(metrics.range_position, 0.5);
    }

    #[test]
    fn test_invalid_thresholds_are_rejected() {
        let config = ComparisonConfig {
            market: MarketThresholds {
                premium: 0.1,
                above_average: 0.3,
            },
            ..ComparisonConfig::default()
        };
        assert!(MarketComparator::new(&schema(), "GrLivArea", config).is_err());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: ComparisonConfig = serde_json::from_str(r#"{ "market": { "premium": 0.3 } }"#).unwrap();
        assert_eq!(config.market.premium, 0.3);
        assert_eq!(config.market.above_average, 0.0);
        assert_eq!(config.efficiency, EfficiencyThresholds::default());
    }
}
