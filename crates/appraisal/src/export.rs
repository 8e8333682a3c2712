//! Export functionality for appraisal results.
//!
//! Flattens each appraisal (or failed request) into an [`AppraisalRecord`]
//! row and writes rows as CSV, compact JSON or pretty JSON.

use crate::appraiser::Appraisal;
use crate::error::AppraisalError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Comma-separated values format.
    #[default]
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" | "pretty" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(format!(
                "unknown format '{other}' (expected csv, json or pretty-json)"
            ))),
        }
    }
}

/// Flat per-request row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppraisalRecord {
    /// Request identifier
    pub id: String,
    /// Estimate in USD
    pub point_estimate: Option<f64>,
    /// ± margin in USD
    pub error_margin: Option<f64>,
    /// Lower band in USD
    pub lower: Option<f64>,
    /// Upper band in USD
    pub upper: Option<f64>,
    /// Display currency code
    pub currency: Option<String>,
    /// Estimate in the display currency
    pub display_estimate: Option<f64>,
    /// (estimate − mean) / mean
    pub relative_difference: Option<f64>,
    /// Market category label
    pub category: Option<String>,
    /// USD per sq ft
    pub price_per_sqft: Option<f64>,
    /// `loaded` or `fallback`
    pub metadata_source: Option<String>,
    /// Error message of a failed request
    pub error: Option<String>,
}

impl AppraisalRecord {
    /// Row for a successful appraisal.
    pub fn from_appraisal(id: impl Into<String>, appraisal: &Appraisal) -> Self {
        let prediction = &appraisal.prediction;
        let comparison = appraisal.comparison.as_ref();
        Self {
            id: id.into(),
            point_estimate: Some(prediction.point_estimate),
            error_margin: Some(prediction.error_margin),
            lower: Some(prediction.point_estimate - prediction.error_margin),
            upper: Some(prediction.point_estimate + prediction.error_margin),
            currency: Some(appraisal.display.currency.to_string()),
            display_estimate: Some(appraisal.display.point_estimate),
            relative_difference: comparison.map(|c| c.relative_difference),
            category: comparison.map(|c| c.category.to_string()),
            price_per_sqft: comparison.map(|c| c.price_per_sqft),
            metadata_source: Some(
                if appraisal.metadata_source.is_fallback() {
                    "fallback"
                } else {
                    "loaded"
                }
                .to_string(),
            ),
            error: None,
        }
    }

    /// Row for a failed request.
    pub fn failed(id: impl Into<String>, error: &AppraisalError) -> Self {
        Self {
            id: id.into(),
            point_estimate: None,
            error_margin: None,
            lower: None,
            upper: None,
            currency: None,
            display_estimate: None,
            relative_difference: None,
            category: None,
            price_per_sqft: None,
            metadata_source: None,
            error: Some(error.to_string()),
        }
    }

    /// Row for either outcome.
    pub fn from_result(id: impl Into<String>, result: &Result<Appraisal, AppraisalError>) -> Self {
        match result {
            Ok(appraisal) => Self::from_appraisal(id, appraisal),
            Err(e) => Self::failed(id, e),
        }
    }
}

/// Trait for exportable data types.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl Exporter for [AppraisalRecord] {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for record in self {
                    wtr.serialize(record)?;
                }
                let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
                String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for Appraisal {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let id = self.id.clone().unwrap_or_default();
                std::slice::from_ref(&AppraisalRecord::from_appraisal(id, self)).export_to_string(format)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}
