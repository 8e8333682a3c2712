//! Raw user input.
//!
//! A [`RawInput`] is a request-scoped mapping from semantic attribute names
//! (e.g. `living_area`, `quality`, `garage_cars`) to a value and the unit it
//! was entered in. Attribute keys are normalised on the way in, so
//! `living-area`, `Living Area` and `living_area` address the same attribute.

use crate::error::{FeatureError, Result};
use crate::units::{AreaUnit, Currency, ExchangeRate};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unit a raw value was entered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum RawUnit {
    /// An area in the given unit
    #[display("area ({_0})")]
    Area(AreaUnit),
    /// A monetary amount in the given currency
    #[display("currency ({_0})")]
    Currency(Currency),
    /// A plain number (count, grade, year)
    #[default]
    #[display("scalar")]
    Scalar,
}

/// A single raw measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawValue {
    /// Numeric value as entered
    pub value: f64,
    /// Unit the value was entered in
    #[serde(default)]
    pub unit: RawUnit,
}

impl RawValue {
    /// A unitless value.
    pub const fn scalar(value: f64) -> Self {
        Self {
            value,
            unit: RawUnit::Scalar,
        }
    }

    /// An area value.
    pub const fn area(value: f64, unit: AreaUnit) -> Self {
        Self {
            value,
            unit: RawUnit::Area(unit),
        }
    }

    /// A monetary value.
    pub const fn currency(value: f64, currency: Currency) -> Self {
        Self {
            value,
            unit: RawUnit::Currency(currency),
        }
    }
}

/// Normalise an attribute key: lower-case, with `-` and whitespace folded to `_`.
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' | '\t' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Raw, possibly incomplete, user input for one prediction request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawInputWire")]
pub struct RawInput {
    values: HashMap<String, RawValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exchange_rate: Option<ExchangeRate>,
}

#[derive(Deserialize)]
struct RawInputWire {
    #[serde(default)]
    values: HashMap<String, RawValue>,
    #[serde(default)]
    exchange_rate: Option<ExchangeRate>,
}

impl From<RawInputWire> for RawInput {
    fn from(wire: RawInputWire) -> Self {
        let mut input = Self::new();
        input.exchange_rate = wire.exchange_rate;
        for (key, value) in wire.values {
            input.insert(&key, value);
        }
        input
    }
}

impl RawInput {
    /// Create an empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, attribute: &str, value: RawValue) -> Self {
        self.insert(attribute, value);
        self
    }

    /// Set the exchange rate used for non-native currency values.
    pub const fn with_exchange_rate(mut self, rate: ExchangeRate) -> Self {
        self.exchange_rate = Some(rate);
        self
    }

    /// Insert or replace an attribute, returning the previous value.
    pub fn insert(&mut self, attribute: &str, value: RawValue) -> Option<RawValue> {
        self.values.insert(normalize_key(attribute), value)
    }

    /// Remove an attribute.
    pub fn remove(&mut self, attribute: &str) -> Option<RawValue> {
        self.values.remove(&normalize_key(attribute))
    }

    /// Look up an attribute by (un-normalised) name.
    pub fn get(&self, attribute: &str) -> Option<&RawValue> {
        self.values.get(&normalize_key(attribute))
    }

    /// Iterate over normalised attribute names.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of attributes supplied.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no attribute was supplied.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Exchange rate supplied with the request, if any.
    pub const fn exchange_rate(&self) -> Option<ExchangeRate> {
        self.exchange_rate
    }

    /// Boundary validation: every value must be finite, and areas and
    /// monetary amounts cannot be negative.
    pub fn validate(&self) -> Result<()> {
        for (attribute, raw) in &self.values {
            if !raw.value.is_finite() {
                return Err(FeatureError::invalid_value(
                    attribute.as_str(),
                    raw.value,
                    "value must be finite",
                ));
            }
            if raw.value < 0.0 && !matches!(raw.unit, RawUnit::Scalar) {
                return Err(FeatureError::invalid_value(
                    attribute.as_str(),
                    raw.value,
                    format!("{} cannot be negative", raw.unit),
                ));
            }
        }
        Ok(())
    }
}
