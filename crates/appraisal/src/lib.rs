#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod appraiser;
pub mod config;
pub mod error;
pub mod export;

// Re-export main types from sub-crates
pub use appraisal_analysis as analysis;
pub use appraisal_features as features;
pub use appraisal_model as model;

pub use appraiser::{
    AnalysisOptions, Appraisal, AppraisalRequest, Appraiser, Degradation, DisplayPrice,
};
pub use config::{AppraisalConfig, default_feature_order};
pub use error::AppraisalError;
pub use export::{AppraisalRecord, ExportError, ExportFormat, Exporter};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
