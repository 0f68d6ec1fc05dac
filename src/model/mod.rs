//! Model artifacts
//!
//! The service treats every artifact as a black box behind three traits:
//! [`FeatureScaler`], [`Classifier`] and [`LabelDecoder`]. The concrete types
//! in this module are the JSON-serialized implementations written by the
//! `train` command; tests inject their own fakes through the same traits.

pub mod artifacts;
pub mod encoder;
pub mod ensemble;
pub mod scaler;

use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::utils::{CropAdvisorError, Result, ResultExt};

pub use artifacts::{
    load_components, ArtifactManifest, ArtifactPaths, ArtifactSet, LoadMetadata, TrainingMetrics,
};
pub use encoder::LabelEncoder;
pub use ensemble::{Aggregation, DecisionTree, Node, TreeEnsemble};
pub use scaler::StandardScaler;

/// Per-feature transform applied before classification
pub trait FeatureScaler: Send + Sync + fmt::Debug {
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>>;
    fn n_features(&self) -> usize;
}

/// Maps a scaled feature vector to a class index
pub trait Classifier: Send + Sync + fmt::Debug {
    fn predict(&self, features: &[f64]) -> Result<usize>;
    fn n_features(&self) -> usize;
    fn n_classes(&self) -> usize;
}

/// Maps a class index back to its original label
pub trait LabelDecoder: Send + Sync + fmt::Debug {
    fn inverse_transform(&self, index: usize) -> Result<String>;
    fn classes(&self) -> &[String];
}

/// Classifier variants the service can hold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Random forest, the default
    #[default]
    #[serde(rename = "rf")]
    RandomForest,
    /// Gradient-boosted trees
    #[serde(rename = "xgb")]
    Xgb,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "rf",
            ModelKind::Xgb => "xgb",
        }
    }

    /// Interpret the optional `model` field of a request. Only a string equal to
    /// "xgb" (any case) selects boosting; everything else means the default.
    pub fn from_request(value: Option<&serde_json::Value>) -> Self {
        match value.and_then(|v| v.as_str()) {
            Some(s) if s.trim().eq_ignore_ascii_case("xgb") => ModelKind::Xgb,
            _ => ModelKind::RandomForest,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of the largest score. Ties go to the lowest index.
pub fn argmax(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Deserialize a JSON artifact from disk
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&json).map_err(|e| {
        CropAdvisorError::Serialization(format!("Failed to deserialize {:?}: {}", path, e))
    })
}

/// Serialize an artifact to disk, creating parent directories as needed
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|e| {
        CropAdvisorError::Serialization(format!("Failed to serialize {:?}: {}", path, e))
    })?;

    fs::write(path, json)?;
    Ok(())
}
