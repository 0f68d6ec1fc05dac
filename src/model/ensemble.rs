//! Tree-ensemble classifier
//!
//! One format covers both classifier variants:
//! - `average`: leaves hold class distributions and the forest averages them (random forest)
//! - `sum`: leaves hold per-class scores that are added to `base_score` (gradient boosting)
//!
//! Either way the predicted class is the argmax of the aggregated scores.

use serde::{Deserialize, Serialize};

use super::{argmax, Classifier};
use crate::utils::{CropAdvisorError, Result};

/// How per-tree leaf vectors are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Average,
    Sum,
}

/// A tree node. Samples with `x[feature] <= threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(Vec<f64>),
}

/// Flat node array; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// Walk from the root to a leaf. The step bound rejects cyclic node graphs.
    pub fn leaf(&self, features: &[f64]) -> Result<&[f64]> {
        let mut idx = 0;
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(Node::Leaf(values)) => return Ok(values),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = features.get(*feature).ok_or_else(|| {
                        CropAdvisorError::InvalidInput(format!("feature {} not provided", feature))
                    })?;
                    idx = if *x <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(CropAdvisorError::Artifact(format!(
                        "node index {} out of bounds",
                        idx
                    )))
                }
            }
        }
        Err(CropAdvisorError::Artifact("tree traversal did not reach a leaf".into()))
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(CropAdvisorError::Artifact("tree has no nodes".into()));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(CropAdvisorError::Artifact(format!(
                            "node {} splits on feature {} but only {} exist",
                            idx, feature, n_features
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(CropAdvisorError::Artifact(format!(
                            "node {} has a NaN threshold",
                            idx
                        )));
                    }
                    if *left >= self.nodes.len() || *right >= self.nodes.len() {
                        return Err(CropAdvisorError::Artifact(format!(
                            "node {} has a child outside the tree",
                            idx
                        )));
                    }
                }
                Node::Leaf(values) => {
                    if values.len() != n_classes {
                        return Err(CropAdvisorError::Artifact(format!(
                            "leaf {} has {} values, expected {}",
                            idx,
                            values.len(),
                            n_classes
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub n_features: usize,
    pub n_classes: usize,
    pub aggregation: Aggregation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_score: Option<Vec<f64>>,
    pub trees: Vec<DecisionTree>,
}

impl TreeEnsemble {
    /// Structural check run once at load time so prediction never indexes out of bounds
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(CropAdvisorError::Artifact("ensemble has no trees".into()));
        }
        if self.n_classes == 0 {
            return Err(CropAdvisorError::Artifact("ensemble has zero classes".into()));
        }
        if let Some(base) = &self.base_score {
            if base.len() != self.n_classes {
                return Err(CropAdvisorError::Artifact(format!(
                    "base_score has {} values, expected {}",
                    base.len(),
                    self.n_classes
                )));
            }
        }
        for tree in &self.trees {
            tree.validate(self.n_features, self.n_classes)?;
        }
        Ok(())
    }

    /// Aggregated per-class scores
    pub fn predict_scores(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.n_features {
            return Err(CropAdvisorError::InvalidInput(format!(
                "classifier expects {} features, got {}",
                self.n_features,
                features.len()
            )));
        }

        let mut scores = match (&self.aggregation, &self.base_score) {
            (Aggregation::Sum, Some(base)) => base.clone(),
            _ => vec![0.0; self.n_classes],
        };

        for tree in &self.trees {
            let leaf = tree.leaf(features)?;
            for (s, v) in scores.iter_mut().zip(leaf) {
                *s += v;
            }
        }

        if self.aggregation == Aggregation::Average {
            let n = self.trees.len() as f64;
            scores.iter_mut().for_each(|s| *s /= n);
        }

        Ok(scores)
    }
}

impl Classifier for TreeEnsemble {
    fn predict(&self, features: &[f64]) -> Result<usize> {
        let scores = self.predict_scores(features)?;
        argmax(&scores).ok_or_else(|| CropAdvisorError::Artifact("empty score vector".into()))
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}
