//! Input parsing
//!
//! Turns `--set name=value` flags and batch CSV rows into raw inputs. Surface
//! attributes take the row's (or flag's) area unit; everything else is read
//! as a plain number.

use appraisal::AppraisalRequest;
use appraisal::features::{AreaUnit, Currency, FeatureUnit, RawInput, RawValue, catalog_entry};
use std::io::Read;
use thiserror::Error;

/// Errors raised while reading command-line or CSV input.
#[derive(Debug, Error)]
pub(crate) enum InputError {
    /// Malformed `name=value` flag
    #[error("Invalid assignment '{0}': expected name=value")]
    Assignment(String),

    /// Non-numeric cell
    #[error("Invalid number for '{attribute}' in row {row}: '{value}'")]
    Number {
        /// Column header
        attribute: String,
        /// 1-based data row
        row: usize,
        /// Cell text
        value: String,
    },

    /// Unknown area unit cell
    #[error("Invalid area unit in row {row}: {reason}")]
    AreaUnit {
        /// 1-based data row
        row: usize,
        /// Parser message
        reason: String,
    },

    /// CSV reading error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Parse one `name=value` flag.
pub(crate) fn parse_assignment(s: &str) -> Result<(String, f64), InputError> {
    let invalid = || InputError::Assignment(s.to_string());
    let (name, value) = s.split_once('=').ok_or_else(invalid)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid());
    }
    let value = value.trim().parse::<f64>().map_err(|_| invalid())?;
    Ok((name.to_string(), value))
}

/// Raw value for `attribute`, tagged with `unit` when it is a surface.
pub(crate) fn raw_value(attribute: &str, value: f64, unit: AreaUnit) -> RawValue {
    match catalog_entry(attribute) {
        Some(entry) if entry.unit == FeatureUnit::Area => RawValue::area(value, unit),
        _ => RawValue::scalar(value),
    }
}

/// Read one request per CSV row.
///
/// The header names the attributes. `id` and `area_unit` columns are
/// optional; rows without an id are named `row-N`. Empty cells are treated
/// as absent attributes.
pub(crate) fn read_requests<R: Read>(
    reader: R,
    currency: Currency,
) -> Result<Vec<AppraisalRequest>, InputError> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv.headers()?.clone();
    let id_col = headers.iter().position(|h| h.eq_ignore_ascii_case("id"));
    let unit_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("area_unit"));

    let mut requests = Vec::new();
    for (index, record) in csv.records().enumerate() {
        let record = record?;
        let row = index + 1;
        let cell = |col: Option<usize>| col.and_then(|c| record.get(c)).filter(|v| !v.is_empty());

        let unit = match cell(unit_col) {
            Some(text) => text.parse::<AreaUnit>().map_err(|e| InputError::AreaUnit {
                row,
                reason: e.to_string(),
            })?,
            None => AreaUnit::SquareFeet,
        };

        let mut input = RawInput::new();
        for (col, (header, value)) in headers.iter().zip(record.iter()).enumerate() {
            if Some(col) == id_col || Some(col) == unit_col || value.is_empty() {
                continue;
            }
            let number = value.parse::<f64>().map_err(|_| InputError::Number {
                attribute: header.to_string(),
                row,
                value: value.to_string(),
            })?;
            input.insert(header, raw_value(header, number, unit));
        }

        let id = cell(id_col).map_or_else(|| format!("row-{row}"), str::to_string);
        requests.push(
            AppraisalRequest::new(input)
                .with_id(id)
                .with_currency(currency),
        );
    }

    log::debug!("Read {} requests", requests.len());
    Ok(requests)
}
