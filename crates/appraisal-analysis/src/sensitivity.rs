//! Sensitivity Analysis
//!
//! One-at-a-time local sensitivity: every perturbation starts from the same
//! base vector, changes exactly one feature, re-clamps it and re-runs the
//! engine.
//!
//! impact = perturbed_estimate − base_estimate
//!
//! Perturbations never see each other's changes and nothing is cached
//! between calls.

use crate::error::AnalysisError;
use appraisal_features::{CanonicalVector, FeatureSchema};
use appraisal_model::{InferenceEngine, PredictionResult};
use serde::{Deserialize, Serialize};

/// Change applied to a single feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    /// Add a value
    Delta(f64),
    /// Multiply by a factor
    Scale(f64),
}

impl Adjustment {
    /// Apply the adjustment to a native value.
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::Delta(delta) => value + delta,
            Self::Scale(factor) => value * factor,
        }
    }
}

/// A named what-if on one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perturbation {
    /// Human-readable label
    pub label: String,
    /// Feature name, attribute or alias
    pub feature: String,
    /// Change applied
    pub adjustment: Adjustment,
}

impl Perturbation {
    /// Create a perturbation.
    pub fn new(label: impl Into<String>, feature: impl Into<String>, adjustment: Adjustment) -> Self {
        Self {
            label: label.into(),
            feature: feature.into(),
            adjustment,
        }
    }

    /// Additive perturbation labelled after its feature.
    pub fn delta(feature: &str, delta: f64) -> Self {
        Self::new(format!("{feature} {delta:+}"), feature, Adjustment::Delta(delta))
    }

    /// Multiplicative perturbation labelled after its feature.
    pub fn scale(feature: &str, factor: f64) -> Self {
        Self::new(format!("{feature} x{factor}"), feature, Adjustment::Scale(factor))
    }

    /// The standard what-if set, restricted to features present in `schema`:
    /// one more quality grade, one more full bathroom, ten years older and
    /// ten percent less living area.
    pub fn standard(schema: &FeatureSchema) -> Vec<Self> {
        [
            Self::new("+1 quality grade", "OverallQual", Adjustment::Delta(1.0)),
            Self::new("+1 full bathroom", "FullBath", Adjustment::Delta(1.0)),
            Self::new("10 years older", "YearBuilt", Adjustment::Delta(-10.0)),
            Self::new("-10% living area", "GrLivArea", Adjustment::Scale(0.9)),
        ]
        .into_iter()
        .filter(|p| schema.find(&p.feature).is_some())
        .collect()
    }
}

/// Outcome of one perturbation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityEntry {
    /// Perturbation label
    pub label: String,
    /// Schema feature that was changed
    pub feature: String,
    /// Change applied
    pub adjustment: Adjustment,
    /// Feature value in the base vector
    pub base_value: f64,
    /// Feature value after adjustment and clamping
    pub perturbed_value: f64,
    /// Estimate with the perturbed vector
    pub perturbed_estimate: f64,
    /// perturbed_estimate − base_estimate
    pub impact: f64,
}

/// A perturbation that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityFailure {
    /// Perturbation label
    pub label: String,
    /// Requested feature
    pub feature: String,
    /// Why it failed
    pub reason: String,
}

/// Marginal price impact of each perturbation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityReport {
    /// Estimate every impact is measured against
    pub base_estimate: f64,
    /// Evaluated perturbations, in request order
    pub entries: Vec<SensitivityEntry>,
    /// Perturbations that failed
    pub failures: Vec<SensitivityFailure>,
}

impl SensitivityReport {
    /// Impact of the perturbation with `label`.
    pub fn impact(&self, label: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.label == label).map(|e| e.impact)
    }

    /// Impact of the first perturbation on `feature`.
    pub fn impact_on(&self, feature: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.feature == feature)
            .map(|e| e.impact)
    }

    /// Whether every perturbation was evaluated.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs perturbations through an [`InferenceEngine`].
#[derive(Debug, Clone, Copy)]
pub struct SensitivityAnalyzer<'a> {
    engine: &'a InferenceEngine,
}

impl<'a> SensitivityAnalyzer<'a> {
    /// Create an analyzer for `engine`.
    pub const fn new(engine: &'a InferenceEngine) -> Self {
        Self { engine }
    }

    /// Evaluate `perturbations` independently against `vector`.
    ///
    /// Failed perturbations are recorded in the report; the others are still
    /// evaluated.
    pub fn perturb(
        &self,
        base: &PredictionResult,
        vector: &CanonicalVector,
        perturbations: &[Perturbation],
    ) -> SensitivityReport {
        let mut entries = Vec::with_capacity(perturbations.len());
        let mut failures = Vec::new();

        for perturbation in perturbations {
            match self.evaluate(base, vector, perturbation) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    log::warn!("Perturbation '{}' failed: {e}", perturbation.label);
                    failures.push(SensitivityFailure {
                        label: perturbation.label.clone(),
                        feature: perturbation.feature.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        SensitivityReport {
            base_estimate: base.point_estimate,
            entries,
            failures,
        }
    }

    fn evaluate(
        &self,
        base: &PredictionResult,
        vector: &CanonicalVector,
        perturbation: &Perturbation,
    ) -> Result<SensitivityEntry, AnalysisError> {
        let schema = self.engine.schema();
        let index = schema
            .find(&perturbation.feature)
            .ok_or_else(|| AnalysisError::UnknownFeature(perturbation.feature.clone()))?;
        let feature = schema.features()[index].name.clone();

        let adjusted = schema.adjust(vector, &feature, |x| perturbation.adjustment.apply(x))?;
        let perturbed = self.engine.predict(&adjusted)?;

        Ok(SensitivityEntry {
            label: perturbation.label.clone(),
            base_value: vector.as_slice()[index],
            perturbed_value: adjusted.as_slice()[index],
            perturbed_estimate: perturbed.point_estimate,
            impact: perturbed.point_estimate - base.point_estimate,
            adjustment: perturbation.adjustment,
            feature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appraisal_features::RawInput;
    use appraisal_model::{
        EstimatorError, FeatureMetadata, FnEstimator, LinearEstimator, MetadataSource, ModelContext,
    };
    use approx::assert_relative_eq;
    use std::sync::Arc;

    const ORDER: [&str; 4] = ["OverallQual", "GrLivArea", "YearBuilt", "FullBath"];

    fn context() -> ModelContext {
        // price = 10 000 × quality + 100 × area + 500 × year + 8 000 × baths − 1 000 000
        ModelContext::from_parts(
            Arc::new(LinearEstimator::new(-1_000_000.0, vec![10_000.0, 100.0, 500.0, 8_000.0]).unwrap()),
            FeatureMetadata::fallback(&ORDER),
            MetadataSource::Fallback,
        )
        .unwrap()
    }

    #[test]
    fn test_standard_perturbations() {
        let context = context();
        let engine = context.engine();
        let vector = context.schema().resolve(&RawInput::new()).unwrap();
        let base = engine.predict(&vector).unwrap();

        let perturbations = Perturbation::standard(context.schema());
        assert_eq!(perturbations.len(), 4);

        let report = SensitivityAnalyzer::new(engine).perturb(&base, &vector, &perturbations);
        assert!(report.is_complete());
        assert_relative_eq!(report.impact("+1 quality grade").unwrap(), 10_000.0);
        assert_relative_eq!(report.impact("+1 full bathroom").unwrap(), 8_000.0);
        assert_relative_eq!(report.impact("10 years older").unwrap(), -5_000.0);
        // 1500 sq ft × 0.1 × 100
        assert_relative_eq!(report.impact("-10% living area").unwrap(), -15_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_perturbations_are_independent() {
        let context = context();
        let engine = context.engine();
        let vector = context.schema().resolve(&RawInput::new()).unwrap();
        let snapshot = vector.clone();
        let base = engine.predict(&vector).unwrap();
        let analyzer = SensitivityAnalyzer::new(engine);

        let quality = Perturbation::delta("OverallQual", 1.0);
        let age = Perturbation::delta("YearBuilt", -10.0);

        let alone = analyzer.perturb(&base, &vector, std::slice::from_ref(&quality));
        assert_eq!(vector, snapshot);
        let together = analyzer.perturb(&base, &vector, &[age.clone(), quality.clone()]);
        assert_eq!(vector, snapshot);
        let reversed = analyzer.perturb(&base, &vector, &[quality, age]);
        assert_eq!(vector, snapshot);

        assert_eq!(alone.impact_on("OverallQual"), together.impact_on("OverallQual"));
        assert_eq!(together.impact_on("YearBuilt"), reversed.impact_on("YearBuilt"));
    }

    #[test]
    fn test_perturbation_is_reclamped() {
        let context = context();
        let engine = context.engine();
        let input = RawInput::new().with("quality", appraisal_features::RawValue::scalar(10.0));
        let vector = context.schema().resolve(&input).unwrap();
        let base = engine.predict(&vector).unwrap();

        let report = SensitivityAnalyzer::new(engine).perturb(&base, &vector, &[Perturbation::delta("quality", 1.0)]);
        let entry = &report.entries[0];
        assert_eq!(entry.feature, "OverallQual");
        assert_eq!(entry.perturbed_value, 10.0);
        assert_eq!(entry.impact, 0.0);
    }

    #[test]
    fn test_failures_do_not_stop_the_report() {
        let context = context();
        let engine = context.engine();
        let vector = context.schema().resolve(&RawInput::new()).unwrap();
        let base = engine.predict(&vector).unwrap();

        let report = SensitivityAnalyzer::new(engine).perturb(
            &base,
            &vector,
            &[Perturbation::delta("PoolArea", 10.0), Perturbation::delta("FullBath", 1.0)],
        );
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].feature, "PoolArea");
        assert!(!report.is_complete());
    }

    #[test]
    fn test_inference_failure_is_recorded() {
        // Fails whenever quality exceeds 7
        let estimator = FnEstimator::new(|x| {
            if x[0] > 7.0 {
                Err(EstimatorError::Failed("out of support".to_string()))
            } else {
                Ok(100_000.0)
            }
        });
        let context = ModelContext::from_parts(
            Arc::new(estimator),
            FeatureMetadata::fallback(&ORDER),
            MetadataSource::Fallback,
        )
        .unwrap();
        let vector = context.schema().resolve(&RawInput::new()).unwrap();
        let base = context.engine().predict(&vector).unwrap();

        let report = SensitivityAnalyzer::new(context.engine())
            .perturb(&base, &vector, &Perturbation::standard(context.schema()));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].label, "+1 quality grade");
        assert_eq!(report.entries.len(), 3);
    }

    #[test]
    fn test_standard_skips_absent_features() {
        let context = ModelContext::from_parts(
            Arc::new(LinearEstimator::new(0.0, vec![1.0]).unwrap()),
            FeatureMetadata::fallback(&["GarageCars"]),
            MetadataSource::Fallback,
        )
        .unwrap();
        assert!(Perturbation::standard(context.schema()).is_empty());
    }
}
