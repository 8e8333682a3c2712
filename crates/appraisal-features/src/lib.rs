#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod assembler;
pub mod catalog;
pub mod error;
pub mod input;
pub mod schema;
pub mod units;

pub use assembler::{Assembly, ClampedFeature, FeatureAssembler};
pub use catalog::{CatalogEntry, FeatureCategory, catalog_entry, housing_features};
pub use error::{FeatureError, Result};
pub use input::{RawInput, RawUnit, RawValue, normalize_key};
pub use schema::{CanonicalVector, FeatureDescriptor, FeatureSchema, FeatureUnit};
pub use units::{
    AreaUnit, Currency, ExchangeRate, NATIVE_AREA_UNIT, NATIVE_CURRENCY, SQFT_PER_SQM,
    area_to_native, currency_to_native, native_to_area, native_to_currency,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
