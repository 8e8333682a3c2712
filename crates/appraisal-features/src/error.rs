//! Error types for feature assembly.

use thiserror::Error;

/// Result type for feature operations.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Errors that can occur while converting units or assembling features.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// A raw measurement is negative, non-finite or in an incompatible unit.
    #[error("Invalid value {value} for '{attribute}': {reason}")]
    InvalidUnitValue {
        /// Attribute (or quantity) the value was supplied for
        attribute: String,
        /// The rejected value
        value: f64,
        /// Why the value was rejected
        reason: String,
    },

    /// A schema declaration is inconsistent.
    #[error("Invalid feature schema: {0}")]
    InvalidSchema(String),

    /// A feature name is not part of the schema.
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// A vector does not fit the schema it is used with.
    #[error("Vector length {actual} does not match schema length {expected}")]
    LengthMismatch {
        /// Schema length
        expected: usize,
        /// Vector length
        actual: usize,
    },

    /// A vector was assembled for a schema with a different feature order.
    #[error("Vector was built for a different feature schema")]
    IncompatibleSchema,
}

impl FeatureError {
    /// Shorthand for [`FeatureError::InvalidUnitValue`].
    pub fn invalid_value(attribute: impl Into<String>, value: f64, reason: impl Into<String>) -> Self {
        Self::InvalidUnitValue {
            attribute: attribute.into(),
            value,
            reason: reason.into(),
        }
    }
}
