//! Inference Predictor Module
//!
//! Runs one validated feature vector through scaler → classifier → label decoder.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::PredictionError;
use crate::features::FeatureVector;
use crate::model::{ArtifactSet, ModelKind};

/// Result of a single prediction, serialized as the `/predict` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    /// Predicted crop name
    pub prediction: String,
    /// Classifier that produced the prediction
    pub model: ModelKind,
    /// Active artifact version
    pub model_version: String,
}

/// Read-only prediction pipeline over one artifact set
#[derive(Debug, Clone)]
pub struct Predictor {
    artifacts: Arc<ArtifactSet>,
}

impl Predictor {
    pub fn new(artifacts: ArtifactSet) -> Self {
        Self {
            artifacts: Arc::new(artifacts),
        }
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    /// False in mock mode
    pub fn is_ready(&self) -> bool {
        self.artifacts.is_loaded()
    }

    pub fn version(&self) -> &str {
        self.artifacts.version()
    }

    /// Boosted trees only when asked for and present, otherwise the forest
    fn select(&self, requested: ModelKind) -> Result<ModelKind, PredictionError> {
        if requested == ModelKind::Xgb && self.artifacts.xgb.is_some() {
            return Ok(ModelKind::Xgb);
        }
        if self.artifacts.rf.is_some() {
            return Ok(ModelKind::RandomForest);
        }
        Err(PredictionError::ModelUnavailable { requested })
    }

    /// Predict the crop for a validated feature vector
    pub fn predict(
        &self,
        features: &FeatureVector,
        requested: ModelKind,
    ) -> Result<PredictionOutcome, PredictionError> {
        if !self.is_ready() {
            return Err(PredictionError::ModelNotLoaded);
        }
        let (Some(scaler), Some(encoder)) = (&self.artifacts.scaler, &self.artifacts.encoder)
        else {
            return Err(PredictionError::ModelNotLoaded);
        };

        let kind = self.select(requested)?;
        let classifier = self
            .artifacts
            .classifier(kind)
            .ok_or(PredictionError::ModelUnavailable { requested })?;

        let internal = |stage: &str, e: crate::utils::CropAdvisorError| {
            error!("{} failed with {} classifier: {}", stage, kind, e);
            PredictionError::Internal(e.to_string())
        };

        let scaled = scaler
            .transform(features.as_slice())
            .map_err(|e| internal("Scaling", e))?;
        let class_idx = classifier
            .predict(&scaled)
            .map_err(|e| internal("Classification", e))?;
        let label = encoder
            .inverse_transform(class_idx)
            .map_err(|e| internal("Label decoding", e))?;

        debug!("Predicted '{}' (class {}) with {}", label, class_idx, kind);

        Ok(PredictionOutcome {
            prediction: label,
            model: kind,
            model_version: self.version().to_string(),
        })
    }
}
