//! Liveness and metadata endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use crate::model::LoadMetadata;
use crate::server::state::SharedState;

pub const SERVICE_NAME: &str = "crop-prediction-api";

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub uptime_seconds: u64,
    pub metadata: LoadMetadata,
}

/// GET / - Service banner
pub async fn home() -> Json<HomeResponse> {
    Json(HomeResponse {
        status: "ok",
        service: SERVICE_NAME,
    })
}

/// GET /health - Health check with artifact load report
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let artifacts = state.predictor.artifacts();
    Json(HealthResponse {
        status: "ok",
        model_loaded: artifacts.is_loaded(),
        uptime_seconds: state.uptime_seconds(),
        metadata: artifacts.metadata.clone(),
    })
}
