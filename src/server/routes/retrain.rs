//! Retrain endpoint
//!
//! Acknowledges a retraining request without acting on it. Training runs
//! offline through the `train` command; this handler never touches model
//! files or the loaded artifacts.

use axum::{body::Bytes, Json};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::server::error::ApiError;

pub const MISSING_PARAMS_MESSAGE: &str = "Provide dataset_path and new_version in request body.";

#[derive(Debug, Serialize)]
pub struct RetrainResponse {
    pub status: &'static str,
    pub note: &'static str,
    pub requested_new_version: String,
}

fn non_empty_str<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// POST /retrain - Validate and acknowledge a retraining request
pub async fn retrain(body: Bytes) -> Result<Json<RetrainResponse>, ApiError> {
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let (Some(dataset_path), Some(new_version)) = (
        non_empty_str(&payload, "dataset_path"),
        non_empty_str(&payload, "new_version"),
    ) else {
        return Err(ApiError::bad_request(MISSING_PARAMS_MESSAGE));
    };

    info!(
        "Retrain requested: dataset {} -> version {}",
        dataset_path, new_version
    );

    Ok(Json(RetrainResponse {
        status: "retrain_triggered",
        note: "Run `crop_advisor train` offline to build the new version, then restart with MODEL_VERSION set to it.",
        requested_new_version: new_version.to_string(),
    }))
}
