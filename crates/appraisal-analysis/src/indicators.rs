//! Quality Indicators
//!
//! Coarse 0–100 scores summarising a property's vector:
//!
//! - area = min(100, (living + basement) / 3000 × 100)
//! - modernity = clamp(100 − age / 50 × 100, 0, 100)
//! - amenity = min(100, (garage_cars×20 + full_bath×15 + fireplaces×10 + quality×8) / 1.3)
//! - overall = mean of the three
//!
//! A feature missing from the schema contributes 0.

use appraisal_features::{CanonicalVector, FeatureSchema};
use chrono::{Datelike, Utc};
use serde::Serialize;

const AREA_REFERENCE_SQFT: f64 = 3000.0;
const AGE_HORIZON_YEARS: f64 = 50.0;

/// Property quality scores, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityIndicators {
    /// Living plus basement surface score
    pub area_score: f64,
    /// Construction age score
    pub modernity_score: f64,
    /// Garage, bathrooms, fireplaces and finish score
    pub amenity_score: f64,
    /// Mean of the three scores
    pub overall_score: f64,
}

impl QualityIndicators {
    /// Scores for `vector`, ageing against the current year.
    pub fn compute(schema: &FeatureSchema, vector: &CanonicalVector) -> Self {
        Self::compute_at(schema, vector, f64::from(Utc::now().year()))
    }

    /// Scores for `vector`, ageing against `reference_year`.
    pub fn compute_at(schema: &FeatureSchema, vector: &CanonicalVector, reference_year: f64) -> Self {
        let value = |feature: &str| schema.value_of(vector, feature).unwrap_or(0.0);

        let total_area = value("GrLivArea") + value("TotalBsmtSF");
        let area_score = (total_area / AREA_REFERENCE_SQFT * 100.0).min(100.0);

        let modernity_score = match schema.value_of(vector, "YearBuilt") {
            Ok(year) => {
                let age = reference_year - year;
                (100.0 - age / AGE_HORIZON_YEARS * 100.0).clamp(0.0, 100.0)
            }
            Err(_) => 0.0,
        };

        let amenities = value("GarageCars") * 20.0
            + value("FullBath") * 15.0
            + value("Fireplaces") * 10.0
            + value("OverallQual") * 8.0;
        let amenity_score = (amenities / 1.3).min(100.0);

        Self {
            area_score,
            modernity_score,
            amenity_score,
            overall_score: (area_score + modernity_score + amenity_score) / 3.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appraisal_features::catalog_entry;
    use approx::assert_relative_eq;

    fn schema(names: &[&str]) -> FeatureSchema {
        FeatureSchema::new(
            names
                .iter()
                .map(|n| catalog_entry(n).unwrap().descriptor())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_indicators() {
        let schema = schema(&[
            "GrLivArea",
            "TotalBsmtSF",
            "OverallQual",
            "GarageCars",
            "YearBuilt",
            "FullBath",
            "Fireplaces",
        ]);
        let vector = schema
            .vector(vec![1500.0, 1000.0, 7.0, 2.0, 2000.0, 2.0, 1.0])
            .unwrap();
        let scores = QualityIndicators::compute_at(&schema, &vector, 2025.0);

        assert_relative_eq!(scores.area_score, 2500.0 / 3000.0 * 100.0);
        assert_relative_eq!(scores.modernity_score, 50.0);
        // (40 + 30 + 10 + 56) / 1.3 is above the cap
        assert_eq!(scores.amenity_score, 100.0);
        assert_relative_eq!(
            scores.overall_score,
            (scores.area_score + 50.0 + 100.0) / 3.0
        );
    }

    #[test]
    fn test_scores_are_capped() {
        let schema = schema(&["GrLivArea", "TotalBsmtSF", "YearBuilt"]);
        let vector = schema.vector(vec![4000.0, 3000.0, 1900.0]).unwrap();
        let scores = QualityIndicators::compute_at(&schema, &vector, 2025.0);
        assert_eq!(scores.area_score, 100.0);
        assert_eq!(scores.modernity_score, 0.0);
        assert_eq!(scores.amenity_score, 0.0);
    }

    #[test]
    fn test_missing_features_contribute_zero() {
        let schema = schema(&["OverallQual"]);
        let vector = schema.vector(vec![5.0]).unwrap();
        let scores = QualityIndicators::compute_at(&schema, &vector, 2025.0);
        assert_eq!(scores.area_score, 0.0);
        assert_eq!(scores.modernity_score, 0.0);
        assert_relative_eq!(scores.amenity_score, 40.0 / 1.3);
    }
}
