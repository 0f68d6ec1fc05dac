//! Application state for the prediction service
//!
//! Built once at startup and shared read-only across handlers.

use std::sync::Arc;
use std::time::Instant;

use crate::config::ServiceConfig;
use crate::inference::{PredictionLogger, Predictor};
use crate::model::ArtifactSet;

/// Shared application state
#[derive(Debug)]
pub struct AppState {
    /// Service configuration
    pub config: ServiceConfig,
    /// Prediction pipeline over the artifacts loaded at startup
    pub predictor: Predictor,
    /// JSON-lines log of served predictions
    pub logger: PredictionLogger,
    /// Server start time
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ServiceConfig, artifacts: ArtifactSet) -> Self {
        let logger = PredictionLogger::new(config.prediction_log.clone());
        Self {
            config,
            predictor: Predictor::new(artifacts),
            logger,
            started_at: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;
