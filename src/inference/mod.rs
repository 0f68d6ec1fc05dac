//! Inference module: prediction pipeline and prediction logging
//!
//! This module provides:
//! - The [`Predictor`], which scales, classifies and decodes one feature vector
//! - The [`PredictionLogger`], an append-only JSON-lines record of served predictions
//! - The request-level error taxonomy shared by the HTTP layer and the CLI

pub mod prediction_log;
pub mod predictor;

use thiserror::Error;

use crate::features::ValidationError;
use crate::model::ModelKind;

pub use prediction_log::{PredictionLogger, PredictionRecord};
pub use predictor::{PredictionOutcome, Predictor};

/// Message returned while the service runs without a complete artifact set
pub const MODEL_NOT_LOADED_MESSAGE: &str =
    "Models not found. Please train and save models (see /api/retrain or load models into models/).";

/// Everything that can stop a prediction request
#[derive(Error, Debug)]
pub enum PredictionError {
    /// Malformed or out-of-range input
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Request body is not a JSON object
    #[error("Invalid request body: {0}")]
    BadRequest(String),

    /// Mock mode: scaler, encoder or every classifier is absent
    #[error("{}", MODEL_NOT_LOADED_MESSAGE)]
    ModelNotLoaded,

    /// Neither the requested classifier nor the default one is loaded
    #[error("Requested model not available.")]
    ModelUnavailable { requested: ModelKind },

    /// An artifact failed while running. Unexpected; logged at error level.
    #[error("Prediction failed: {0}")]
    Internal(String),
}

impl PredictionError {
    /// Whether the failure is an expected outcome of bad input or missing models,
    /// as opposed to a fault inside an artifact
    pub fn is_expected(&self) -> bool {
        !matches!(self, PredictionError::Internal(_))
    }
}
