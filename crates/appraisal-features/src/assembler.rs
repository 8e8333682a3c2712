//! Feature Assembly
//!
//! Maps a [`RawInput`] onto a [`FeatureSchema`]: every declared feature is
//! looked up (attribute, then aliases, then feature name), converted to native
//! units, defaulted when absent and clamped into its valid range. The output
//! order is the schema order, whatever order the input was built in.

use crate::error::{FeatureError, Result};
use crate::input::{RawInput, RawUnit, RawValue};
use crate::schema::{CanonicalVector, FeatureDescriptor, FeatureSchema, FeatureUnit};
use crate::units::{NATIVE_AREA_UNIT, area_to_native, currency_to_native};
use serde::Serialize;
use std::collections::BTreeSet;

/// A feature whose resolved value fell outside its valid range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClampedFeature {
    /// Feature name
    pub feature: String,
    /// Value after unit conversion, before clamping
    pub raw: f64,
    /// Value stored in the vector
    pub clamped: f64,
}

/// Result of assembling one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assembly {
    /// The canonical vector
    pub vector: CanonicalVector,
    /// Features absent from the input, filled with their default
    pub defaulted: Vec<String>,
    /// Features that were clamped into range
    pub clamped: Vec<ClampedFeature>,
    /// Input attributes that matched no feature of the schema
    pub unused: Vec<String>,
}

/// Builds canonical vectors for one schema.
#[derive(Debug, Clone, Copy)]
pub struct FeatureAssembler<'a> {
    schema: &'a FeatureSchema,
}

impl<'a> FeatureAssembler<'a> {
    /// Create an assembler for `schema`.
    pub const fn new(schema: &'a FeatureSchema) -> Self {
        Self { schema }
    }

    /// The schema vectors are assembled for.
    pub const fn schema(&self) -> &'a FeatureSchema {
        self.schema
    }

    /// Assemble `raw` into a canonical vector with diagnostics.
    ///
    /// # Errors
    /// Returns [`FeatureError::InvalidUnitValue`] if a raw value is not finite,
    /// is a negative area or amount, or carries a unit the feature cannot be
    /// expressed in.
    pub fn assemble(&self, raw: &RawInput) -> Result<Assembly> {
        raw.validate()?;

        let mut values = Vec::with_capacity(self.schema.len());
        let mut defaulted = Vec::new();
        let mut clamped = Vec::new();
        let mut used = BTreeSet::new();

        for descriptor in self.schema.features() {
            let found = descriptor
                .lookup_keys()
                .find_map(|key| raw.get(&key).map(|value| (key, *value)));

            let native = match found {
                Some((key, value)) => {
                    let native = to_native(descriptor, &key, value, raw)?;
                    used.insert(key);
                    native
                }
                None => {
                    log::debug!("{}: absent, using default {}", descriptor.name, descriptor.default);
                    defaulted.push(descriptor.name.clone());
                    descriptor.default
                }
            };

            let value = descriptor.clamp(native);
            if value != native {
                log::debug!("{}: clamped {native} to {value}", descriptor.name);
                clamped.push(ClampedFeature {
                    feature: descriptor.name.clone(),
                    raw: native,
                    clamped: value,
                });
            }
            values.push(value);
        }

        let unused: Vec<String> = raw
            .attributes()
            .filter(|attribute| !used.contains(*attribute))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !unused.is_empty() {
            log::debug!("input attributes matched no feature: {unused:?}");
        }

        Ok(Assembly {
            vector: CanonicalVector::from_parts(values, self.schema.fingerprint()),
            defaulted,
            clamped,
            unused,
        })
    }
}

fn to_native(descriptor: &FeatureDescriptor, key: &str, raw: RawValue, input: &RawInput) -> Result<f64> {
    match (descriptor.unit, raw.unit) {
        (FeatureUnit::Area, RawUnit::Scalar) => area_to_native(raw.value, NATIVE_AREA_UNIT)
            .map_err(|_| FeatureError::invalid_value(key, raw.value, "area cannot be negative")),
        (FeatureUnit::Currency, RawUnit::Scalar) if raw.value < 0.0 => Err(FeatureError::invalid_value(
            key,
            raw.value,
            "amount cannot be negative",
        )),
        (_, RawUnit::Scalar) => Ok(raw.value),
        (FeatureUnit::Area, RawUnit::Area(unit)) => area_to_native(raw.value, unit)
            .map_err(|_| FeatureError::invalid_value(key, raw.value, "area cannot be negative")),
        (FeatureUnit::Currency, RawUnit::Currency(currency)) => {
            if currency == crate::units::NATIVE_CURRENCY {
                return Ok(raw.value);
            }
            let rate = input.exchange_rate().ok_or_else(|| {
                FeatureError::invalid_value(
                    key,
                    raw.value,
                    format!("no exchange rate supplied for {currency}"),
                )
            })?;
            Ok(currency_to_native(raw.value, currency, rate))
        }
        (expected, given) => Err(FeatureError::invalid_value(
            key,
            raw.value,
            format!("{} expects {expected}, got {given}", descriptor.name),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::catalog_entry;
    use crate::units::{AreaUnit, Currency, ExchangeRate};
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    /// Schema in the order `[quality, area, basement, garage_cars,
    /// garage_area, year_built, full_bath, rooms, fireplaces]`.
    fn quality_first_schema() -> FeatureSchema {
        let names = [
            "OverallQual",
            "GrLivArea",
            "TotalBsmtSF",
            "GarageCars",
            "GarageArea",
            "YearBuilt",
            "FullBath",
            "TotRmsAbvGrd",
            "Fireplaces",
        ];
        FeatureSchema::new(
            names
                .iter()
                .map(|n| catalog_entry(n).unwrap().descriptor())
                .collect(),
        )
        .unwrap()
    }

    fn complete_entries() -> Vec<(&'static str, RawValue)> {
        vec![
            ("area", RawValue::area(1500.0, AreaUnit::SquareFeet)),
            ("quality", RawValue::scalar(7.0)),
            ("garage_cars", RawValue::scalar(2.0)),
            ("year_built", RawValue::scalar(2000.0)),
            ("full_bath", RawValue::scalar(2.0)),
            ("rooms", RawValue::scalar(7.0)),
            ("fireplaces", RawValue::scalar(1.0)),
            ("basement_sqft", RawValue::area(1000.0, AreaUnit::SquareFeet)),
            ("garage_area", RawValue::area(500.0, AreaUnit::SquareFeet)),
        ]
    }

    fn input_from(entries: &[(&str, RawValue)]) -> RawInput {
        entries
            .iter()
            .fold(RawInput::new(), |input, (k, v)| input.with(k, *v))
    }

    #[test]
    fn test_assembles_in_schema_order() {
        let schema = quality_first_schema();
        let assembly = FeatureAssembler::new(&schema)
            .assemble(&input_from(&complete_entries()))
            .unwrap();

        assert_eq!(
            assembly.vector.as_slice(),
            &[7.0, 1500.0, 1000.0, 2.0, 500.0, 2000.0, 2.0, 7.0, 1.0]
        );
        assert!(assembly.defaulted.is_empty());
        assert!(assembly.clamped.is_empty());
        assert!(assembly.unused.is_empty());
    }

    #[test]
    fn test_missing_feature_uses_default() {
        let schema = quality_first_schema();
        let entries: Vec<_> = complete_entries()
            .into_iter()
            .filter(|(k, _)| *k != "fireplaces")
            .collect();
        let assembly = FeatureAssembler::new(&schema).assemble(&input_from(&entries)).unwrap();

        assert_eq!(assembly.vector.len(), 9);
        assert_eq!(assembly.vector.as_slice()[8], 1.0);
        assert_eq!(assembly.defaulted, vec!["Fireplaces".to_string()]);
    }

    #[test]
    fn test_out_of_range_quality_is_clamped() {
        let schema = quality_first_schema();
        let mut input = input_from(&complete_entries());
        input.insert("quality", RawValue::scalar(12.0));

        let assembly = FeatureAssembler::new(&schema).assemble(&input).unwrap();
        assert_eq!(assembly.vector.as_slice()[0], 10.0);
        assert_eq!(
            assembly.clamped,
            vec![ClampedFeature {
                feature: "OverallQual".to_string(),
                raw: 12.0,
                clamped: 10.0,
            }]
        );
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let schema = quality_first_schema();
        let assembler = FeatureAssembler::new(&schema);
        let mut entries = complete_entries();
        let expected = assembler.assemble(&input_from(&entries)).unwrap().vector;

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            entries.shuffle(&mut rng);
            let vector = assembler.assemble(&input_from(&entries)).unwrap().vector;
            assert_eq!(vector, expected);
        }
    }

    #[test]
    fn test_clamped_values_stay_in_range() {
        let schema = quality_first_schema();
        let assembler = FeatureAssembler::new(&schema);
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..200 {
            let input = schema.features().iter().fold(RawInput::new(), |input, d| {
                let low = if d.unit == FeatureUnit::Area { 0.0 } else { -100.0 };
                let value = rand::Rng::gen_range(&mut rng, low..10_000.0);
                input.with(&d.attribute, RawValue::scalar(value))
            });
            let vector = assembler.assemble(&input).unwrap().vector;
            for (value, descriptor) in vector.as_slice().iter().zip(schema.features()) {
                assert!(descriptor.contains(*value), "{} = {value}", descriptor.name);
            }
        }
    }

    #[test]
    fn test_square_meters_are_converted() {
        let schema = quality_first_schema();
        let input = RawInput::new().with("living_area", RawValue::area(150.0, AreaUnit::SquareMeters));
        let assembly = FeatureAssembler::new(&schema).assemble(&input).unwrap();

        assert_relative_eq!(assembly.vector.as_slice()[1], 1614.6, epsilon = 1e-9);
        assert_eq!(assembly.defaulted.len(), 8);
    }

    #[test]
    fn test_negative_area_is_rejected() {
        let schema = quality_first_schema();
        let input = RawInput::new().with("living_area", RawValue::area(-5.0, AreaUnit::SquareMeters));
        assert!(matches!(
            FeatureAssembler::new(&schema).assemble(&input),
            Err(FeatureError::InvalidUnitValue { .. })
        ));
    }

    #[test]
    fn test_untagged_negative_area_is_rejected() {
        let schema = quality_first_schema();
        let input = RawInput::new().with("living_area", RawValue::scalar(-1500.0));
        assert!(matches!(
            FeatureAssembler::new(&schema).assemble(&input),
            Err(FeatureError::InvalidUnitValue { .. })
        ));

        // Negative counts and years stay plain numbers and are clamped
        let input = RawInput::new().with("fireplaces", RawValue::scalar(-1.0));
        let assembly = FeatureAssembler::new(&schema).assemble(&input).unwrap();
        assert_eq!(assembly.clamped[0].feature, "Fireplaces");
    }

    #[test]
    fn test_incompatible_unit_is_rejected() {
        let schema = quality_first_schema();
        let input = RawInput::new().with("quality", RawValue::area(7.0, AreaUnit::SquareFeet));
        assert!(FeatureAssembler::new(&schema).assemble(&input).is_err());
    }

    #[test]
    fn test_currency_feature_needs_rate() {
        let descriptor =
            FeatureDescriptor::new("LotPrice", "lot_price", FeatureUnit::Currency, 0.0, 1e6, 0.0).unwrap();
        let schema = FeatureSchema::new(vec![descriptor]).unwrap();
        let assembler = FeatureAssembler::new(&schema);

        let input = RawInput::new().with("lot_price", RawValue::currency(8_500.0, Currency::Eur));
        assert!(assembler.assemble(&input).is_err());

        let input = input.with_exchange_rate(ExchangeRate::new(0.85).unwrap());
        let vector = assembler.assemble(&input).unwrap().vector;
        assert_relative_eq!(vector.as_slice()[0], 10_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_unused_attributes_are_reported() {
        let schema = quality_first_schema();
        let input = input_from(&complete_entries()).with("pool_area", RawValue::scalar(40.0));
        let assembly = FeatureAssembler::new(&schema).assemble(&input).unwrap();
        assert_eq!(assembly.unused, vec!["pool_area".to_string()]);
    }
}
