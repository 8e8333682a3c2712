//! Feature Schema
//!
//! The ordered feature contract of one model artifact. The order of the
//! descriptors is the order the estimator was trained on; every
//! [`CanonicalVector`] produced from a schema follows it exactly and carries a
//! fingerprint of it, so a vector can never be fed to a model whose schema
//! declares a different order.

use crate::assembler::FeatureAssembler;
use crate::error::{FeatureError, Result};
use crate::input::{RawInput, normalize_key};
use derive_more::Display;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Native unit kind of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum FeatureUnit {
    /// Area in square feet
    #[display("sq ft")]
    Area,
    /// Monetary amount in US dollars
    #[display("USD")]
    Currency,
    /// Plain number (count, grade, year)
    #[display("scalar")]
    Scalar,
}

/// Declaration of a single model input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    /// Feature name as the model knows it (e.g. `GrLivArea`)
    pub name: String,
    /// Semantic attribute name looked up in [`RawInput`] (e.g. `living_area`)
    pub attribute: String,
    /// Additional attribute names accepted for legacy inputs
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Native unit kind
    pub unit: FeatureUnit,
    /// Lowest valid value (native units)
    pub valid_min: f64,
    /// Highest valid value (native units)
    pub valid_max: f64,
    /// Value substituted when the attribute is absent
    pub default: f64,
}

impl FeatureDescriptor {
    /// Create a validated descriptor.
    ///
    /// # Errors
    /// Returns [`FeatureError::InvalidSchema`] if the range is empty or not
    /// finite, or if the default lies outside it.
    pub fn new(
        name: impl Into<String>,
        attribute: impl Into<String>,
        unit: FeatureUnit,
        valid_min: f64,
        valid_max: f64,
        default: f64,
    ) -> Result<Self> {
        let descriptor = Self {
            name: name.into(),
            attribute: normalize_key(&attribute.into()),
            aliases: Vec::new(),
            unit,
            valid_min,
            valid_max,
            default,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Add accepted legacy attribute names.
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.aliases
            .extend(aliases.into_iter().map(|a| normalize_key(a.as_ref())));
        self
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FeatureError::InvalidSchema(
                "feature name cannot be empty".to_string(),
            ));
        }
        if !(self.valid_min.is_finite() && self.valid_max.is_finite()) {
            return Err(FeatureError::InvalidSchema(format!(
                "range of '{}' must be finite",
                self.name
            )));
        }
        if self.valid_min > self.valid_max {
            return Err(FeatureError::InvalidSchema(format!(
                "range of '{}' is empty: [{}, {}]",
                self.name, self.valid_min, self.valid_max
            )));
        }
        if !self.contains(self.default) {
            return Err(FeatureError::InvalidSchema(format!(
                "default {} of '{}' lies outside [{}, {}]",
                self.default, self.name, self.valid_min, self.valid_max
            )));
        }
        Ok(())
    }

    /// Clamp a native value into the valid range.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.valid_min, self.valid_max)
    }

    /// Whether a native value lies inside the valid range.
    pub fn contains(&self, value: f64) -> bool {
        (self.valid_min..=self.valid_max).contains(&value)
    }

    /// Keys this descriptor answers to, in lookup priority order:
    /// attribute, aliases, then the feature name itself.
    pub fn lookup_keys(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.attribute.clone())
            .chain(self.aliases.iter().cloned())
            .chain(std::iter::once(normalize_key(&self.name)))
    }

    /// Whether `key` addresses this descriptor.
    pub fn matches(&self, key: &str) -> bool {
        let key = normalize_key(key);
        self.lookup_keys().any(|k| k == key)
    }
}

/// Ordered, immutable feature contract of a model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSchema {
    features: Vec<FeatureDescriptor>,
    #[serde(skip)]
    fingerprint: u64,
}

impl FeatureSchema {
    /// Create a schema from descriptors in model order.
    ///
    /// # Errors
    /// Returns [`FeatureError::InvalidSchema`] for an empty schema, duplicate
    /// feature names, or attribute keys claimed by more than one feature.
    pub fn new(features: Vec<FeatureDescriptor>) -> Result<Self> {
        if features.is_empty() {
            return Err(FeatureError::InvalidSchema(
                "schema must declare at least one feature".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut keys = HashSet::new();
        for descriptor in &features {
            descriptor.validate()?;
            if !names.insert(descriptor.name.as_str()) {
                return Err(FeatureError::InvalidSchema(format!(
                    "duplicate feature '{}'",
                    descriptor.name
                )));
            }
            // A key may repeat within one descriptor (name == attribute), not across them.
            let own: HashSet<String> = descriptor.lookup_keys().collect();
            for key in own {
                if !keys.insert(key.clone()) {
                    return Err(FeatureError::InvalidSchema(format!(
                        "attribute '{key}' is claimed by more than one feature"
                    )));
                }
            }
        }

        let fingerprint = Self::compute_fingerprint(&features);
        Ok(Self {
            features,
            fingerprint,
        })
    }

    fn compute_fingerprint(features: &[FeatureDescriptor]) -> u64 {
        let mut hasher = DefaultHasher::new();
        features.len().hash(&mut hasher);
        for descriptor in features {
            descriptor.name.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Always false for a constructed schema.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Descriptors in model order.
    pub fn features(&self) -> &[FeatureDescriptor] {
        &self.features
    }

    /// Feature names in model order.
    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    /// Identifier of the feature order; equal for schemas with identical order.
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Whether vectors built for `other` may be used with this schema.
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint && self.names() == other.names()
    }

    /// Position of a feature by exact name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }

    /// Descriptor by exact name.
    pub fn get(&self, name: &str) -> Option<&FeatureDescriptor> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Position of the feature answering to `key` (name, attribute or alias).
    pub fn find(&self, key: &str) -> Option<usize> {
        self.index_of(key)
            .or_else(|| self.features.iter().position(|f| f.matches(key)))
    }

    /// Resolve raw input into a canonical vector.
    pub fn resolve(&self, raw: &RawInput) -> Result<CanonicalVector> {
        Ok(FeatureAssembler::new(self).assemble(raw)?.vector)
    }

    /// Build a canonical vector from native values in schema order, clamping
    /// each value into its valid range.
    ///
    /// # Errors
    /// Returns [`FeatureError::LengthMismatch`] if `values` has the wrong
    /// length and [`FeatureError::InvalidUnitValue`] for non-finite values.
    pub fn vector(&self, values: Vec<f64>) -> Result<CanonicalVector> {
        if values.len() != self.len() {
            return Err(FeatureError::LengthMismatch {
                expected: self.len(),
                actual: values.len(),
            });
        }
        let values = values
            .into_iter()
            .zip(&self.features)
            .map(|(v, f)| {
                if v.is_finite() {
                    Ok(f.clamp(v))
                } else {
                    Err(FeatureError::invalid_value(f.name.as_str(), v, "value must be finite"))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(CanonicalVector {
            values,
            fingerprint: self.fingerprint,
        })
    }

    /// Copy `vector`, change exactly one feature and re-clamp it.
    ///
    /// The input vector is left untouched.
    pub fn adjust<F>(&self, vector: &CanonicalVector, feature: &str, change: F) -> Result<CanonicalVector>
    where
        F: FnOnce(f64) -> f64,
    {
        self.check(vector)?;
        let index = self
            .find(feature)
            .ok_or_else(|| FeatureError::UnknownFeature(feature.to_string()))?;
        let descriptor = &self.features[index];

        let changed = change(vector.values[index]);
        if !changed.is_finite() {
            return Err(FeatureError::invalid_value(
                descriptor.name.as_str(),
                changed,
                "adjusted value must be finite",
            ));
        }

        let mut adjusted = vector.clone();
        adjusted.values[index] = descriptor.clamp(changed);
        Ok(adjusted)
    }

    /// Value of a feature (by name, attribute or alias) in `vector`.
    pub fn value_of(&self, vector: &CanonicalVector, key: &str) -> Result<f64> {
        self.check(vector)?;
        self.find(key)
            .map(|i| vector.values[i])
            .ok_or_else(|| FeatureError::UnknownFeature(key.to_string()))
    }

    /// Verify that `vector` was built for this schema.
    pub fn check(&self, vector: &CanonicalVector) -> Result<()> {
        if vector.len() != self.len() {
            return Err(FeatureError::LengthMismatch {
                expected: self.len(),
                actual: vector.len(),
            });
        }
        if vector.fingerprint != self.fingerprint {
            return Err(FeatureError::IncompatibleSchema);
        }
        Ok(())
    }
}

/// Ordered numeric model input in native units.
///
/// Only a [`FeatureSchema`] can create one, so every value is finite and
/// inside its feature's valid range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalVector {
    values: Vec<f64>,
    #[serde(skip)]
    fingerprint: u64,
}

impl CanonicalVector {
    pub(crate) const fn from_parts(values: Vec<f64>, fingerprint: u64) -> Self {
        Self {
            values,
            fingerprint,
        }
    }

    /// Values in schema order.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Values as an ndarray view.
    pub fn view(&self) -> ArrayView1<'_, f64> {
        ArrayView1::from(self.values.as_slice())
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a position.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Fingerprint of the schema the vector was built for.
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}
