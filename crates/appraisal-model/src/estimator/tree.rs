//! Gradient-boosted regression trees
//!
//! prediction = base_score + Σ leaf value reached in each tree
//!
//! Split rule: `x < threshold` goes left, otherwise right. A missing value
//! (NaN) follows the node's default direction. Nodes are stored flat with the
//! root at index 0, and every child index must be greater than its parent's,
//! so traversal always terminates.

use super::{Estimator, EstimatorError};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// A single tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// Internal split node
    Split {
        /// Index of the input feature tested
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Node index taken when `x < threshold`
        left: usize,
        /// Node index taken otherwise
        right: usize,
        /// Whether missing values go left
        #[serde(default)]
        default_left: bool,
    },
    /// Terminal node
    Leaf {
        /// Leaf contribution
        value: f64,
    },
}

/// One regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    /// Flat node list, root first
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Create a tree from a flat node list.
    pub const fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    fn validate(&self, n_features: usize) -> Result<(), EstimatorError> {
        if self.nodes.is_empty() {
            return Err(EstimatorError::InvalidModel("tree has no nodes".to_string()));
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if feature >= n_features {
                        return Err(EstimatorError::InvalidModel(format!(
                            "node {index} tests feature {feature}, model has {n_features}"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(EstimatorError::InvalidModel(format!(
                            "node {index} has a non-finite threshold"
                        )));
                    }
                    for child in [left, right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(EstimatorError::InvalidModel(format!(
                                "node {index} points to invalid child {child}"
                            )));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(EstimatorError::InvalidModel(format!(
                            "leaf {index} has a non-finite value"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Leaf value reached by `features`.
    ///
    /// # Errors
    /// [`EstimatorError::InvalidModel`] if the walk leaves the node list,
    /// revisits a node or tests a feature `features` does not have.
    pub fn leaf_value(&self, features: ArrayView1<'_, f64>) -> Result<f64, EstimatorError> {
        let mut index = 0;
        for _ in 0..self.nodes.len() {
            let node = self.nodes.get(index).ok_or_else(|| {
                EstimatorError::InvalidModel(format!("tree has no node {index}"))
            })?;
            match *node {
                TreeNode::Leaf { value } => return Ok(value),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = *features.get(feature).ok_or(EstimatorError::InvalidInput {
                        expected: feature + 1,
                        actual: features.len(),
                    })?;
                    let go_left = if x.is_nan() { default_left } else { x < threshold };
                    index = if go_left { left } else { right };
                }
            }
        }
        Err(EstimatorError::InvalidModel(
            "tree walk did not reach a leaf".to_string(),
        ))
    }
}

/// Additive ensemble of regression trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EnsembleSpec", into = "EnsembleSpec")]
pub struct TreeEnsemble {
    base_score: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

#[derive(Serialize, Deserialize)]
struct EnsembleSpec {
    #[serde(default)]
    base_score: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl TryFrom<EnsembleSpec> for TreeEnsemble {
    type Error = EstimatorError;

    fn try_from(spec: EnsembleSpec) -> Result<Self, Self::Error> {
        Self::new(spec.base_score, spec.n_features, spec.trees)
    }
}

impl From<TreeEnsemble> for EnsembleSpec {
    fn from(model: TreeEnsemble) -> Self {
        Self {
            base_score: model.base_score,
            n_features: model.n_features,
            trees: model.trees,
        }
    }
}

impl TreeEnsemble {
    /// Create a validated ensemble.
    ///
    /// # Errors
    /// Returns [`EstimatorError::InvalidModel`] if the ensemble is empty, a
    /// node references a missing feature or child, or a value is not finite.
    pub fn new(
        base_score: f64,
        n_features: usize,
        trees: Vec<RegressionTree>,
    ) -> Result<Self, EstimatorError> {
        if n_features == 0 {
            return Err(EstimatorError::InvalidModel(
                "ensemble must declare at least one feature".to_string(),
            ));
        }
        if trees.is_empty() {
            return Err(EstimatorError::InvalidModel("ensemble has no trees".to_string()));
        }
        if !base_score.is_finite() {
            return Err(EstimatorError::InvalidModel(
                "base score must be finite".to_string(),
            ));
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(n_features)
                .map_err(|e| EstimatorError::InvalidModel(format!("tree {i}: {e}")))?;
        }
        Ok(Self {
            base_score,
            n_features,
            trees,
        })
    }

    /// Number of trees.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Base score added to every prediction.
    pub const fn base_score(&self) -> f64 {
        self.base_score
    }
}

impl Estimator for TreeEnsemble {
    fn predict(&self, features: ArrayView1<'_, f64>) -> Result<f64, EstimatorError> {
        if features.len() != self.n_features {
            return Err(EstimatorError::InvalidInput {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        self.trees
            .iter()
            .try_fold(self.base_score, |sum, tree| Ok(sum + tree.leaf_value(features)?))
    }

    fn input_len(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn name(&self) -> &str {
        "tree_ensemble"
    }
}
