//! Appraiser
//!
//! Request orchestration:
//!
//! raw input → assembly → inference → {sensitivity, comparison, indicators}
//!
//! Assembly and inference failures fail the request. Sensitivity and
//! comparison problems never do; they are listed as [`Degradation`]s next to
//! whatever could be computed. The appraiser holds the shared model context
//! read-only, so any number of requests may run in parallel.

use crate::config::AppraisalConfig;
use crate::error::AppraisalError;
use appraisal_analysis::{
    ComparisonMetrics, MarketComparator, Perturbation, QualityIndicators, SensitivityAnalyzer,
    SensitivityReport,
};
use appraisal_features::{ClampedFeature, Currency, ExchangeRate, FeatureAssembler, RawInput, native_to_currency};
use appraisal_model::{MetadataSource, ModelContext, PredictionResult, SharedModel};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which analytics to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Run the what-if perturbations
    pub sensitivity: bool,
    /// Compare with the reference population
    pub comparison: bool,
    /// Compute quality indicators
    pub indicators: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            sensitivity: true,
            comparison: true,
            indicators: true,
        }
    }
}

/// One appraisal request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppraisalRequest {
    /// Caller-side identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Property attributes
    pub input: RawInput,
    /// Currency to display prices in
    #[serde(default = "default_currency")]
    pub currency: Currency,
    /// Analytics to compute
    #[serde(default)]
    pub options: AnalysisOptions,
}

const fn default_currency() -> Currency {
    Currency::Usd
}

impl AppraisalRequest {
    /// Request with default options, displayed in USD.
    pub fn new(input: RawInput) -> Self {
        Self {
            id: None,
            input,
            currency: Currency::Usd,
            options: AnalysisOptions::default(),
        }
    }

    /// Set the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the display currency.
    pub const fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Set the analytics to compute.
    pub const fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }
}

/// Estimate and band converted to the display currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayPrice {
    /// Display currency
    pub currency: Currency,
    /// Display-currency units per US dollar
    pub exchange_rate: f64,
    /// Converted estimate
    pub point_estimate: f64,
    /// Converted margin
    pub error_margin: f64,
    /// Converted lower band
    pub lower: f64,
    /// Converted upper band
    pub upper: f64,
}

impl DisplayPrice {
    fn new(prediction: &PredictionResult, currency: Currency, rate: ExchangeRate) -> Self {
        let convert = |usd: f64| native_to_currency(usd, currency, rate);
        let exchange_rate = match currency {
            Currency::Usd => 1.0,
            Currency::Eur => rate.get(),
        };
        Self {
            currency,
            exchange_rate,
            point_estimate: convert(prediction.point_estimate),
            error_margin: convert(prediction.error_margin),
            lower: convert(prediction.point_estimate - prediction.error_margin),
            upper: convert(prediction.point_estimate + prediction.error_margin),
        }
    }
}

/// Reduced-confidence or partial result marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// Metadata artifact was missing; statistics and ranges are defaults
    FallbackMetadata,
    /// Market comparison could not be computed
    ComparisonUnavailable {
        /// Why
        reason: String,
    },
    /// Some perturbations failed
    SensitivityIncomplete {
        /// Labels of the failed perturbations
        failed: Vec<String>,
    },
}

/// Full structured result of one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Appraisal {
    /// Caller-side identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Native-unit prediction
    pub prediction: PredictionResult,
    /// Prediction in the display currency
    pub display: DisplayPrice,
    /// Features filled with their default
    pub defaulted_features: Vec<String>,
    /// Features clamped into range
    pub clamped_features: Vec<ClampedFeature>,
    /// Input attributes no feature used
    pub unused_attributes: Vec<String>,
    /// What-if impacts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<SensitivityReport>,
    /// Market position
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonMetrics>,
    /// Quality scores
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicators: Option<QualityIndicators>,
    /// Where the metadata came from
    pub metadata_source: MetadataSource,
    /// Degraded or partial parts of the result
    pub degradations: Vec<Degradation>,
}

impl Appraisal {
    /// Whether any part of the result is degraded.
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Appraises properties against one loaded model.
#[derive(Debug)]
pub struct Appraiser {
    context: Arc<ModelContext>,
    comparator: Result<MarketComparator, String>,
    perturbations: Vec<Perturbation>,
    rate: ExchangeRate,
    config: AppraisalConfig,
}

impl Appraiser {
    /// Create an appraiser over a loaded context.
    ///
    /// # Errors
    /// [`AppraisalError::Config`] if the configuration is invalid.
    pub fn new(context: Arc<ModelContext>, config: AppraisalConfig) -> Result<Self, AppraisalError> {
        config.validate()?;
        let rate = config.exchange_rate()?;

        let comparator = MarketComparator::new(context.schema(), &config.area_attribute, config.comparison)
            .map_err(|e| {
                log::warn!("Market comparison disabled: {e}");
                e.to_string()
            });
        let perturbations = config.perturbations_for(context.schema());

        Ok(Self {
            context,
            comparator,
            perturbations,
            rate,
            config,
        })
    }

    /// Create an appraiser from a load-once handle.
    ///
    /// # Errors
    /// [`AppraisalError::Unavailable`] if the model failed to load.
    pub fn from_shared(shared: &SharedModel, config: AppraisalConfig) -> Result<Self, AppraisalError> {
        let context = shared.get().map_err(AppraisalError::Unavailable)?;
        Self::new(context, config)
    }

    /// The shared model context.
    pub const fn context(&self) -> &Arc<ModelContext> {
        &self.context
    }

    /// The active configuration.
    pub const fn config(&self) -> &AppraisalConfig {
        &self.config
    }

    /// Appraise one property.
    ///
    /// # Errors
    /// [`AppraisalError::Feature`] if the input is rejected and
    /// [`AppraisalError::Inference`] if the estimator fails.
    pub fn appraise(&self, request: &AppraisalRequest) -> Result<Appraisal, AppraisalError> {
        let context = &self.context;
        let input = self.with_rate(&request.input);
        let rate = input.exchange_rate().unwrap_or(self.rate);

        let assembly = FeatureAssembler::new(context.schema()).assemble(&input)?;
        let prediction = context.engine().predict(&assembly.vector)?;

        let mut degradations = Vec::new();
        if prediction.is_degraded() {
            degradations.push(Degradation::FallbackMetadata);
        }

        let sensitivity = request.options.sensitivity.then(|| {
            let report = SensitivityAnalyzer::new(context.engine()).perturb(
                &prediction,
                &assembly.vector,
                &self.perturbations,
            );
            if !report.is_complete() {
                degradations.push(Degradation::SensitivityIncomplete {
                    failed: report.failures.iter().map(|f| f.label.clone()).collect(),
                });
            }
            report
        });

        let comparison = if request.options.comparison {
            match self.compare(&prediction) {
                Ok(metrics) => Some(metrics),
                Err(reason) => {
                    log::warn!("Comparison unavailable: {reason}");
                    degradations.push(Degradation::ComparisonUnavailable { reason });
                    None
                }
            }
        } else {
            None
        };

        let indicators = request
            .options
            .indicators
            .then(|| QualityIndicators::compute(context.schema(), &assembly.vector));

        Ok(Appraisal {
            id: request.id.clone(),
            display: DisplayPrice::new(&prediction, request.currency, rate),
            metadata_source: prediction.source.clone(),
            prediction,
            defaulted_features: assembly.defaulted,
            clamped_features: assembly.clamped,
            unused_attributes: assembly.unused,
            sensitivity,
            comparison,
            indicators,
            degradations,
        })
    }

    /// Appraise many properties in parallel; results keep the request order.
    pub fn appraise_batch(&self, requests: &[AppraisalRequest]) -> Vec<Result<Appraisal, AppraisalError>> {
        log::debug!("Appraising batch of {} requests", requests.len());
        requests.par_iter().map(|request| self.appraise(request)).collect()
    }

    fn compare(&self, prediction: &PredictionResult) -> Result<ComparisonMetrics, String> {
        let comparator = self.comparator.as_ref().map_err(Clone::clone)?;
        comparator
            .compare(prediction, self.context.statistics())
            .map_err(|e| e.to_string())
    }

    fn with_rate(&self, input: &RawInput) -> RawInput {
        match input.exchange_rate() {
            Some(_) => input.clone(),
            None => input.clone().with_exchange_rate(self.rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appraisal_features::{AreaUnit, RawValue};
    use appraisal_model::{FeatureMetadata, LinearEstimator};
    use approx::assert_relative_eq;

    fn appraiser(order: &[&str], coefficients: Vec<f64>) -> Appraiser {
        let context = ModelContext::from_parts(
            Arc::new(LinearEstimator::new(0.0, coefficients).unwrap()),
            FeatureMetadata::fallback(order),
            MetadataSource::Fallback,
        )
        .unwrap();
        Appraiser::new(Arc::new(context), AppraisalConfig::default()).unwrap()
    }

    #[test]
    fn test_appraise_in_euros() {
        let appraiser = appraiser(&["GrLivArea"], vec![100.0]);
        let request = AppraisalRequest::new(
            RawInput::new().with("living_area", RawValue::area(2000.0, AreaUnit::SquareFeet)),
        )
        .with_currency(Currency::Eur);

        let appraisal = appraiser.appraise(&request).unwrap();
        assert_relative_eq!(appraisal.prediction.point_estimate, 200_000.0);
        assert_relative_eq!(appraisal.display.point_estimate, 170_000.0);
        assert_relative_eq!(appraisal.display.lower, 185_000.0 * 0.85);
        assert_eq!(appraisal.display.exchange_rate, 0.85);
        assert_eq!(appraisal.degradations, vec![Degradation::FallbackMetadata]);
    }

    #[test]
    fn test_request_rate_overrides_config() {
        let appraiser = appraiser(&["GrLivArea"], vec![100.0]);
        let rate = ExchangeRate::new(0.5).unwrap();
        let request = AppraisalRequest::new(
            RawInput::new()
                .with("living_area", RawValue::area(2000.0, AreaUnit::SquareFeet))
                .with_exchange_rate(rate),
        )
        .with_currency(Currency::Eur);

        let appraisal = appraiser.appraise(&request).unwrap();
        assert_eq!(appraisal.display.exchange_rate, 0.5);
        assert_relative_eq!(appraisal.display.point_estimate, 100_000.0);
        assert_relative_eq!(appraisal.display.upper, 215_000.0 * 0.5);
    }

    #[test]
    fn test_options_disable_analytics() {
        let appraiser = appraiser(&["GrLivArea"], vec![100.0]);
        let options = AnalysisOptions {
            sensitivity: false,
            comparison: false,
            indicators: false,
        };
        let appraisal = appraiser
            .appraise(&AppraisalRequest::new(RawInput::new()).with_options(options))
            .unwrap();
        assert!(appraisal.sensitivity.is_none());
        assert!(appraisal.comparison.is_none());
        assert!(appraisal.indicators.is_none());
    }

    #[test]
    fn test_missing_area_feature_degrades_comparison() {
        let appraiser = appraiser(&["OverallQual"], vec![25_000.0]);
        let appraisal = appraiser.appraise(&AppraisalRequest::new(RawInput::new())).unwrap();

        assert!(appraisal.comparison.is_none());
        assert!(appraisal.degradations.iter().any(|d| matches!(
            d,
            Degradation::ComparisonUnavailable { reason } if reason.contains("living_area")
        )));
        assert_relative_eq!(appraisal.prediction.point_estimate, 175_000.0);
    }

    #[test]
    fn test_rejected_input_fails_request() {
        let appraiser = appraiser(&["GrLivArea"], vec![100.0]);
        let request = AppraisalRequest::new(
            RawInput::new().with("living_area", RawValue::area(-3.0, AreaUnit::SquareMeters)),
        );
        assert!(matches!(appraiser.appraise(&request), Err(AppraisalError::Feature(_))));
    }

    #[test]
    fn test_unavailable_model() {
        let shared = SharedModel::new(|| {
            Err(appraisal_model::ModelError::InvalidArtifact("corrupt".to_string()))
        });
        let err = Appraiser::from_shared(&shared, AppraisalConfig::default()).unwrap_err();
        assert!(matches!(err, AppraisalError::Unavailable(_)));
        assert!(err.to_string().starts_with("Prediction unavailable"));
    }
}
