//! HTTP prediction service
//!
//! Every route is served at the root and again under `/api`.

pub mod error;
pub mod routes;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::{AppState, SharedState};

fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(routes::health::home))
        .route("/health", get(routes::health::health_check))
        .route("/metadata", get(routes::metadata::get_metadata))
        .route("/predict", post(routes::predict::predict))
        .route("/retrain", post(routes::retrain::retrain))
}

/// Build the service router over shared state
pub fn router(state: SharedState) -> Router {
    Router::new()
        .merge(routes())
        .nest("/api", routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
