//! Prediction endpoint

use axum::{body::Bytes, extract::State, Json};
use serde_json::Value;
use tracing::info;

use crate::features::validate_input;
use crate::inference::{PredictionError, PredictionOutcome, PredictionRecord};
use crate::model::ModelKind;
use crate::server::error::ApiError;
use crate::server::state::SharedState;

/// POST /predict - Recommend a crop for one set of soil and climate readings
///
/// The body is parsed as JSON whatever its Content-Type. In mock mode the
/// request is refused before the body is looked at.
pub async fn predict(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<PredictionOutcome>, ApiError> {
    if !state.predictor.is_ready() {
        return Err(PredictionError::ModelNotLoaded.into());
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| PredictionError::BadRequest(e.to_string()))?;
    let data = payload
        .as_object()
        .ok_or_else(|| PredictionError::BadRequest("expected a JSON object".to_string()))?;

    let features = validate_input(data).map_err(PredictionError::from)?;
    let requested = ModelKind::from_request(data.get("model"));
    let outcome = state.predictor.predict(&features, requested)?;

    info!(
        "Predicted '{}' with {} v{}",
        outcome.prediction, outcome.model, outcome.model_version
    );

    let record = PredictionRecord::new(
        payload.clone(),
        outcome.model,
        &outcome.model_version,
        &outcome.prediction,
    );
    state.logger.record(&record).await;

    Ok(Json(outcome))
}
