//! Housing Feature Catalog
//!
//! The housing features a price model may be trained on, with the semantic
//! attribute each one is read from, accepted legacy aliases, native unit,
//! default valid range and default value.
//!
//! The catalog never dictates feature order. Order always comes from the
//! model's metadata artifact or, in degraded mode, from the caller.

use crate::input::normalize_key;
use crate::schema::{FeatureDescriptor, FeatureUnit};
use chrono::{Datelike, Utc};
use serde::Serialize;

/// Earliest construction year the catalog accepts.
pub const EARLIEST_YEAR_BUILT: f64 = 1900.0;

/// Broad grouping of housing features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureCategory {
    /// Living and basement surfaces
    Surface,
    /// Overall material and finish quality
    Quality,
    /// Garage capacity and surface
    Garage,
    /// Construction year
    Age,
    /// Bathrooms, rooms, fireplaces
    Layout,
}

/// Catalog metadata for one housing feature.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Feature name as models know it
    pub name: &'static str,
    /// Feature category
    pub category: FeatureCategory,
    /// Semantic attribute name in raw input
    pub attribute: &'static str,
    /// Legacy attribute names still accepted
    pub aliases: &'static [&'static str],
    /// Brief description
    pub description: &'static str,
    /// Native unit kind
    pub unit: FeatureUnit,
    /// Lowest valid value
    pub valid_min: f64,
    /// Highest valid value
    pub valid_max: f64,
    /// Value used when the attribute is absent
    pub default: f64,
}

impl CatalogEntry {
    /// Descriptor with the catalog's own range and default.
    pub fn descriptor(&self) -> FeatureDescriptor {
        FeatureDescriptor {
            name: self.name.to_string(),
            attribute: self.attribute.to_string(),
            aliases: self.aliases.iter().map(|a| (*a).to_string()).collect(),
            unit: self.unit,
            valid_min: self.valid_min,
            valid_max: self.valid_max,
            default: self.default,
        }
    }

    /// Descriptor with a range taken from elsewhere (typically the training
    /// ranges in the metadata artifact). The catalog default is clamped into
    /// the new range.
    pub fn descriptor_with_range(&self, valid_min: f64, valid_max: f64) -> FeatureDescriptor {
        let mut descriptor = self.descriptor();
        descriptor.valid_min = valid_min;
        descriptor.valid_max = valid_max;
        descriptor.default = self.default.clamp(valid_min.min(valid_max), valid_max.max(valid_min));
        descriptor
    }
}

fn current_year() -> f64 {
    f64::from(Utc::now().year())
}

/// All known housing features.
pub fn housing_features() -> Vec<CatalogEntry> {
    vec![
        // Surfaces
        CatalogEntry {
            name: "GrLivArea",
            category: FeatureCategory::Surface,
            attribute: "living_area",
            aliases: &["area", "area_sqft", "gr_liv_area", "surface"],
            description: "Above-grade living area",
            unit: FeatureUnit::Area,
            valid_min: 500.0,
            valid_max: 4000.0,
            default: 1500.0,
        },
        CatalogEntry {
            name: "TotalBsmtSF",
            category: FeatureCategory::Surface,
            attribute: "basement_area",
            aliases: &["basement_sqft", "basement", "total_bsmt_sf"],
            description: "Total basement area",
            unit: FeatureUnit::Area,
            valid_min: 0.0,
            valid_max: 3000.0,
            default: 1000.0,
        },
        // Quality
        CatalogEntry {
            name: "OverallQual",
            category: FeatureCategory::Quality,
            attribute: "quality",
            aliases: &["overall_quality", "quality_grade", "overall_qual"],
            description: "Overall material and finish grade (1-10)",
            unit: FeatureUnit::Scalar,
            valid_min: 1.0,
            valid_max: 10.0,
            default: 7.0,
        },
        // Garage
        CatalogEntry {
            name: "GarageCars",
            category: FeatureCategory::Garage,
            attribute: "garage_cars",
            aliases: &["garage_count", "garage"],
            description: "Garage capacity in cars",
            unit: FeatureUnit::Scalar,
            valid_min: 0.0,
            valid_max: 4.0,
            default: 2.0,
        },
        CatalogEntry {
            name: "GarageArea",
            category: FeatureCategory::Garage,
            attribute: "garage_area",
            aliases: &["garage_sqft"],
            description: "Garage area",
            unit: FeatureUnit::Area,
            valid_min: 0.0,
            valid_max: 1500.0,
            default: 500.0,
        },
        // Age
        CatalogEntry {
            name: "YearBuilt",
            category: FeatureCategory::Age,
            attribute: "year_built",
            aliases: &["construction_year", "built"],
            description: "Original construction year",
            unit: FeatureUnit::Scalar,
            valid_min: EARLIEST_YEAR_BUILT,
            valid_max: current_year(),
            default: 2000.0,
        },
        // Layout
        CatalogEntry {
            name: "FullBath",
            category: FeatureCategory::Layout,
            attribute: "full_bath",
            aliases: &["bathrooms", "full_baths"],
            description: "Full bathrooms above grade",
            unit: FeatureUnit::Scalar,
            valid_min: 0.0,
            valid_max: 5.0,
            default: 2.0,
        },
        CatalogEntry {
            name: "TotRmsAbvGrd",
            category: FeatureCategory::Layout,
            attribute: "rooms",
            aliases: &["total_rooms", "tot_rms_abv_grd"],
            description: "Total rooms above grade, bathrooms excluded",
            unit: FeatureUnit::Scalar,
            valid_min: 3.0,
            valid_max: 15.0,
            default: 7.0,
        },
        CatalogEntry {
            name: "Fireplaces",
            category: FeatureCategory::Layout,
            attribute: "fireplaces",
            aliases: &["fireplace"],
            description: "Number of fireplaces",
            unit: FeatureUnit::Scalar,
            valid_min: 0.0,
            valid_max: 3.0,
            default: 1.0,
        },
    ]
}

/// Catalog entry by feature name, attribute or alias.
pub fn catalog_entry(key: &str) -> Option<CatalogEntry> {
    let features = housing_features();
    if let Some(index) = features.iter().position(|f| f.name == key) {
        return Some(features[index].clone());
    }
    let key = normalize_key(key);
    features.into_iter().find(|f| {
        f.attribute == key
            || f.aliases.contains(&key.as_str())
            || normalize_key(f.name) == key
    })
}
