//! Model Artifact
//!
//! Serialized estimator definition. The artifact is a JSON document tagged by
//! `kind`:
//!
//! ```json
//! { "kind": "linear", "intercept": 25000.0, "coefficients": [60.0, 25.0] }
//! ```
//!
//! ```json
//! { "kind": "tree_ensemble", "base_score": 180000.0, "n_features": 9, "trees": [...] }
//! ```

use crate::error::{ArtifactKind, ModelError};
use crate::estimator::{Estimator, LinearEstimator, TreeEnsemble};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// A serialized estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    /// Linear regression
    Linear(LinearEstimator),
    /// Gradient-boosted trees
    TreeEnsemble(TreeEnsemble),
}

impl ModelArtifact {
    /// Parse an artifact from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load an artifact file.
    ///
    /// # Errors
    /// [`ModelError::MissingArtifact`] if the file does not exist,
    /// [`ModelError::Io`] if it cannot be read and [`ModelError::Parse`] if it
    /// is not a valid artifact.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let text = read_artifact(path, ArtifactKind::Model)?;
        Self::from_json(&text).map_err(|source| ModelError::Parse {
            kind: ArtifactKind::Model,
            path: path.to_path_buf(),
            source,
        })
    }

    /// Turn the artifact into a shareable estimator.
    pub fn into_estimator(self) -> Arc<dyn Estimator> {
        match self {
            Self::Linear(model) => Arc::new(model),
            Self::TreeEnsemble(model) => Arc::new(model),
        }
    }
}

/// Load an estimator from an artifact file.
pub fn load_estimator(path: impl AsRef<Path>) -> Result<Arc<dyn Estimator>, ModelError> {
    let path = path.as_ref();
    let estimator = ModelArtifact::load(path)?.into_estimator();
    log::info!(
        "Loaded {} estimator from {}",
        estimator.name(),
        path.display()
    );
    Ok(estimator)
}

/// Read an artifact file, mapping a missing file to
/// [`ModelError::MissingArtifact`].
pub(crate) fn read_artifact(path: &Path, kind: ArtifactKind) -> Result<String, ModelError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ModelError::MissingArtifact {
                kind,
                path: path.to_path_buf(),
            }
        } else {
            ModelError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}
