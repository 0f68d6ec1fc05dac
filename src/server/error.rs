//! HTTP error responses
//!
//! Every failure is answered with `{"error": "<message>"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::inference::PredictionError;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        let status = match &err {
            PredictionError::Invalid(_)
            | PredictionError::BadRequest(_)
            | PredictionError::Internal(_) => StatusCode::BAD_REQUEST,
            PredictionError::ModelNotLoaded | PredictionError::ModelUnavailable { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if err.is_expected() {
            warn!("Rejected prediction request: {}", err);
        } else {
            error!("Prediction error: {}", err);
        }

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
