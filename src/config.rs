//! Configuration for the prediction service and the offline trainer

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utils::{CropAdvisorError, Result};

/// Prediction service configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Directory containing versioned artifacts
    pub model_dir: PathBuf,
    /// Artifact version loaded at startup
    pub model_version: String,
    /// JSON-lines prediction log
    pub prediction_log: PathBuf,
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            model_version: "1".to_string(),
            prediction_log: PathBuf::from("logs/predictions.log"),
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ServiceConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                CropAdvisorError::Config(format!(
                    "invalid bind address {}:{}: {}",
                    self.host, self.port, e
                ))
            })
    }
}

/// Offline RandomForest training parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainConfig {
    /// CSV with N,P,K,temperature,humidity,ph,rainfall,label columns
    pub dataset_path: PathBuf,
    /// Where the artifact set is written
    pub model_dir: PathBuf,
    /// Version stamped into every artifact file name
    pub version: String,
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum tree depth (None = grow until pure)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Held-out fraction for evaluation
    pub test_fraction: f64,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/Crop_recommendation.csv"),
            model_dir: PathBuf::from("models"),
            version: "1".to_string(),
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(CropAdvisorError::Config("n_trees must be at least 1".into()));
        }
        if self.min_samples_split < 2 {
            return Err(CropAdvisorError::Config(
                "min_samples_split must be at least 2".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(CropAdvisorError::Config(
                "test_fraction must be in [0.0, 1.0)".into(),
            ));
        }
        if self.version.trim().is_empty() {
            return Err(CropAdvisorError::Config("version must not be empty".into()));
        }
        Ok(())
    }
}
