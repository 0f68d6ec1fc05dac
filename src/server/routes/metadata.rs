//! Model metadata endpoint

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::model::TrainingMetrics;
use crate::server::state::SharedState;

#[derive(Debug, Serialize)]
pub struct MetadataResponse {
    pub loaded: bool,
    pub model_version: String,
    pub metrics: TrainingMetrics,
    pub source_paths: BTreeMap<String, String>,
}

/// GET /metadata - Active version and its training metrics
///
/// Metrics come from the version's manifest. Without one the fields are null
/// and `notes` says so.
pub async fn get_metadata(State(state): State<SharedState>) -> Json<MetadataResponse> {
    let artifacts = state.predictor.artifacts();
    Json(MetadataResponse {
        loaded: artifacts.is_loaded(),
        model_version: artifacts.version().to_string(),
        metrics: artifacts
            .metrics
            .clone()
            .unwrap_or_else(TrainingMetrics::placeholder),
        source_paths: artifacts.metadata.source_paths.clone(),
    })
}
