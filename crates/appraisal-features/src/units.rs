//! Unit Conversion
//!
//! Pure conversions between the measurement systems and currencies a user may
//! enter values in and the native units the price model was trained on.
//!
//! Native units:
//! - area: square feet
//! - currency: US dollars
//!
//! 1 m² = 10.764 sq ft. The constant is fixed so that conversions are
//! bit-for-bit reproducible across runs.

use crate::error::{FeatureError, Result};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Square feet per square metre.
pub const SQFT_PER_SQM: f64 = 10.764;

/// Area unit the model was trained on.
pub const NATIVE_AREA_UNIT: AreaUnit = AreaUnit::SquareFeet;

/// Currency the model was trained on.
pub const NATIVE_CURRENCY: Currency = Currency::Usd;

/// Supported area units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum AreaUnit {
    /// Square feet (native)
    #[display("sq ft")]
    SquareFeet,
    /// Square metres
    #[display("m²")]
    SquareMeters,
}

impl FromStr for AreaUnit {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqft" | "sq_ft" | "sq ft" | "ft2" | "square_feet" => Ok(Self::SquareFeet),
            "m2" | "sqm" | "sq_m" | "m²" | "square_meters" => Ok(Self::SquareMeters),
            other => Err(FeatureError::InvalidSchema(format!(
                "unknown area unit '{other}' (expected sqft or m2)"
            ))),
        }
    }
}

/// Supported currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    /// US dollar (native)
    #[display("USD")]
    Usd,
    /// Euro
    #[display("EUR")]
    Eur,
}

impl FromStr for Currency {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usd" | "$" => Ok(Self::Usd),
            "eur" | "€" => Ok(Self::Eur),
            other => Err(FeatureError::InvalidSchema(format!(
                "unknown currency '{other}' (expected usd or eur)"
            ))),
        }
    }
}

/// Exchange rate expressed as units of the quote currency per one US dollar.
///
/// The rate is always passed explicitly so callers can audit or override it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ExchangeRate(f64);

impl ExchangeRate {
    /// Create a validated rate (finite and strictly positive).
    pub fn new(rate: f64) -> Result<Self> {
        if rate.is_finite() && rate > 0.0 {
            Ok(Self(rate))
        } else {
            Err(FeatureError::invalid_value(
                "exchange_rate",
                rate,
                "must be finite and positive",
            ))
        }
    }

    /// Quote-currency units per US dollar.
    pub const fn get(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for ExchangeRate {
    type Error = FeatureError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ExchangeRate> for f64 {
    fn from(rate: ExchangeRate) -> Self {
        rate.0
    }
}

fn check_area(value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(FeatureError::invalid_value("area", value, "area must be finite"));
    }
    if value < 0.0 {
        return Err(FeatureError::invalid_value("area", value, "area cannot be negative"));
    }
    Ok(())
}

/// Convert an area into square feet.
pub fn area_to_native(value: f64, from: AreaUnit) -> Result<f64> {
    check_area(value)?;
    Ok(match from {
        AreaUnit::SquareFeet => value,
        AreaUnit::SquareMeters => value * SQFT_PER_SQM,
    })
}

/// Convert an area in square feet into `to`.
pub fn native_to_area(value: f64, to: AreaUnit) -> Result<f64> {
    check_area(value)?;
    Ok(match to {
        AreaUnit::SquareFeet => value,
        AreaUnit::SquareMeters => value / SQFT_PER_SQM,
    })
}

/// Convert an amount in `from` into US dollars.
pub fn currency_to_native(value: f64, from: Currency, rate: ExchangeRate) -> f64 {
    match from {
        Currency::Usd => value,
        Currency::Eur => value / rate.get(),
    }
}

/// Convert an amount in US dollars into `to`.
pub fn native_to_currency(value: f64, to: Currency, rate: ExchangeRate) -> f64 {
    match to {
        Currency::Usd => value,
        Currency::Eur => value * rate.get(),
    }
}
