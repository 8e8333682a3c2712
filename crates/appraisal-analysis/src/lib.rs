#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod indicators;
pub mod market;
pub mod sensitivity;

pub use error::AnalysisError;
pub use indicators::QualityIndicators;
pub use market::{
    AreaEfficiency, ComparisonConfig, ComparisonMetrics, ConfidenceBand, EfficiencyThresholds,
    MarketCategory, MarketComparator, MarketThresholds,
};
pub use sensitivity::{
    Adjustment, Perturbation, SensitivityAnalyzer, SensitivityEntry, SensitivityFailure,
    SensitivityReport,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
