//! Reference Statistics
//!
//! Price statistics of the training population plus the model's reported
//! error. Loaded once with the model and read-only afterwards.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// Training-population price statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStatistics {
    /// Mean sale price
    pub mean_price: f64,
    /// Lowest sale price
    pub min_price: f64,
    /// Highest sale price
    pub max_price: f64,
    /// Number of training samples
    pub sample_count: u64,
    /// Model error used as the ± margin of every estimate
    pub error_margin: f64,
}

impl ReferenceStatistics {
    /// Create validated statistics.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidArtifact`] unless all values are finite,
    /// `mean_price > 0`, `min ≤ mean ≤ max` and `error_margin ≥ 0`.
    pub fn new(
        mean_price: f64,
        min_price: f64,
        max_price: f64,
        sample_count: u64,
        error_margin: f64,
    ) -> Result<Self, ModelError> {
        let stats = Self {
            mean_price,
            min_price,
            max_price,
            sample_count,
            error_margin,
        };
        stats.validate()?;
        Ok(stats)
    }

    /// Check the statistics invariants.
    pub fn validate(&self) -> Result<(), ModelError> {
        let values = [self.mean_price, self.min_price, self.max_price, self.error_margin];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidArtifact(
                "reference statistics must be finite".to_string(),
            ));
        }
        if self.mean_price <= 0.0 {
            return Err(ModelError::InvalidArtifact(format!(
                "mean price must be positive, got {}",
                self.mean_price
            )));
        }
        if !(self.min_price <= self.mean_price && self.mean_price <= self.max_price) {
            return Err(ModelError::InvalidArtifact(format!(
                "expected min <= mean <= max, got {} / {} / {}",
                self.min_price, self.mean_price, self.max_price
            )));
        }
        if self.error_margin < 0.0 {
            return Err(ModelError::InvalidArtifact(format!(
                "error margin cannot be negative, got {}",
                self.error_margin
            )));
        }
        Ok(())
    }

    /// Width of the observed price range.
    pub fn price_range(&self) -> f64 {
        self.max_price - self.min_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_valid_statistics() {
        let stats = ReferenceStatistics::new(180_921.0, 34_900.0, 755_000.0, 1460, 15_000.0).unwrap();
        assert_eq!(stats.price_range(), 720_100.0);
    }

    #[rstest]
    #[case(0.0, 0.0, 10.0, 1.0)]
    #[case(100.0, 200.0, 300.0, 1.0)]
    #[case(100.0, 50.0, 80.0, 1.0)]
    #[case(100.0, 50.0, 200.0, -1.0)]
    #[case(f64::NAN, 50.0, 200.0, 1.0)]
    fn test_invalid_statistics(#[case] mean: f64, #[case] min: f64, #[case] max: f64, #[case] margin: f64) {
        assert!(ReferenceStatistics::new(mean, min, max, 10, margin).is_err());
    }
}
