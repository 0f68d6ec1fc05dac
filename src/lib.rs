//! # Crop Advisor
//!
//! Crop recommendation from soil and climate readings. A versioned set of
//! tree-ensemble artifacts is loaded once at startup and served over HTTP.
//!
//! ## Modules
//!
//! - `features`: The seven input fields, their ranges and request validation
//! - `model`: Artifact traits, JSON artifact types and versioned loading
//! - `inference`: Scale → classify → decode pipeline and the prediction log
//! - `server`: axum router, shared state and error responses
//! - `training`: CSV loading, random forest fitting and artifact export
//! - `utils`: Logging, errors and helper functions
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crop_advisor::model::load_components;
//! use crop_advisor::inference::Predictor;
//!
//! let predictor = Predictor::new(load_components("models".as_ref(), "1"));
//! ```

pub mod config;
pub mod features;
pub mod inference;
pub mod model;
pub mod server;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::{ServiceConfig, TrainConfig};
pub use features::{validate_input, FeatureVector, ValidationError, NUM_FEATURES};
pub use inference::{PredictionError, PredictionLogger, PredictionOutcome, Predictor};
pub use model::{load_components, ArtifactSet, ModelKind};
pub use server::{router, AppState, SharedState};
pub use training::{train, TrainingReport};
pub use utils::error::{CropAdvisorError, Result};

/// Crate version reported at startup
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
