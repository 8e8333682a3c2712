//! Model Context
//!
//! Everything a request needs from the model lifecycle: the inference engine,
//! the feature metadata and the reference statistics. A [`ModelContext`] is
//! built once and then shared read-only; [`SharedModel`] adds load-once
//! semantics for callers that load lazily from several threads.

use crate::artifact::load_estimator;
use crate::engine::InferenceEngine;
use crate::error::ModelError;
use crate::estimator::Estimator;
use crate::metadata::{FeatureMetadata, MetadataSource};
use crate::stats::ReferenceStatistics;
use appraisal_features::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

/// Locations of the model artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    /// Serialized estimator
    pub model: PathBuf,
    /// Feature metadata
    pub metadata: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model: PathBuf::from("model.json"),
            metadata: PathBuf::from("feature_info.json"),
        }
    }
}

/// Loaded model, schema and statistics.
#[derive(Debug, Clone)]
pub struct ModelContext {
    engine: InferenceEngine,
    metadata: FeatureMetadata,
    statistics: ReferenceStatistics,
}

impl ModelContext {
    /// Load the model and its metadata.
    ///
    /// A missing model is fatal. A missing metadata artifact is replaced by
    /// fallback metadata in `fallback_order`, and the context is tagged
    /// [`MetadataSource::Fallback`].
    pub fn load<S: AsRef<str>>(paths: &ArtifactPaths, fallback_order: &[S]) -> Result<Self, ModelError> {
        let estimator = load_estimator(&paths.model)?;
        let (metadata, source) = FeatureMetadata::load_or_fallback(&paths.metadata, fallback_order)?;
        Self::from_parts(estimator, metadata, source)
    }

    /// Assemble a context from an already loaded estimator and metadata.
    pub fn from_parts(
        estimator: Arc<dyn Estimator>,
        metadata: FeatureMetadata,
        source: MetadataSource,
    ) -> Result<Self, ModelError> {
        let schema = metadata.to_schema()?;
        let statistics = metadata.reference_statistics()?;
        let engine = InferenceEngine::new(estimator, schema, statistics.error_margin, source)?;
        log::info!(
            "Model ready: {} estimator, {} features, metadata {}",
            engine.estimator_name(),
            engine.schema().len(),
            engine.source()
        );
        Ok(Self {
            engine,
            metadata,
            statistics,
        })
    }

    /// The inference engine.
    pub const fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// The feature schema.
    pub const fn schema(&self) -> &FeatureSchema {
        self.engine.schema()
    }

    /// The feature metadata.
    pub const fn metadata(&self) -> &FeatureMetadata {
        &self.metadata
    }

    /// The reference statistics.
    pub const fn statistics(&self) -> &ReferenceStatistics {
        &self.statistics
    }

    /// Where the metadata came from.
    pub const fn source(&self) -> &MetadataSource {
        self.engine.source()
    }
}

type Loader = dyn Fn() -> Result<ModelContext, ModelError> + Send + Sync;

/// Load-once handle to a [`ModelContext`].
///
/// The first call to [`SharedModel::get`] runs the loader; concurrent callers
/// wait for it and every later call returns the cached outcome. A failed load
/// is cached too and never retried.
pub struct SharedModel {
    cell: OnceLock<Result<Arc<ModelContext>, Arc<ModelError>>>,
    loader: Box<Loader>,
}

impl SharedModel {
    /// Create a handle around a loader.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<ModelContext, ModelError> + Send + Sync + 'static,
    {
        Self {
            cell: OnceLock::new(),
            loader: Box::new(loader),
        }
    }

    /// Handle that loads from artifact files.
    pub fn from_paths(paths: ArtifactPaths, fallback_order: Vec<String>) -> Self {
        Self::new(move || ModelContext::load(&paths, fallback_order.as_slice()))
    }

    /// Handle around an already loaded context.
    pub fn ready(context: ModelContext) -> Self {
        let shared = Self::new(|| {
            Err(ModelError::InvalidArtifact(
                "preloaded model has no loader".to_string(),
            ))
        });
        // A fresh cell cannot already hold a value.
        let _ = shared.cell.set(Ok(Arc::new(context)));
        shared
    }

    /// The loaded context, loading it on first use.
    pub fn get(&self) -> Result<Arc<ModelContext>, Arc<ModelError>> {
        self.cell
            .get_or_init(|| match (self.loader)() {
                Ok(context) => Ok(Arc::new(context)),
                Err(e) => {
                    log::error!("Model load failed: {e}");
                    Err(Arc::new(e))
                }
            })
            .clone()
    }

    /// Whether a load has completed (successfully or not).
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl fmt::Debug for SharedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedModel")
            .field("cell", &self.cell)
            .finish_non_exhaustive()
    }
}
