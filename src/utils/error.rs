//! Error Handling Module
//!
//! Defines the library error type for artifact loading, training and I/O.
//! Request-level failures live in [`crate::inference::PredictionError`].

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for crop advisor operations
#[derive(Error, Debug)]
pub enum CropAdvisorError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An artifact is malformed or inconsistent with the feature layout
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Manifest digest does not match the file on disk
    #[error("Checksum mismatch for '{path}': expected {expected}, got {actual}")]
    Checksum {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Path listed in a manifest does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error with training
    #[error("Training error: {0}")]
    Training(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for CropAdvisorError {
    fn from(err: serde_json::Error) -> Self {
        CropAdvisorError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for CropAdvisorError {
    fn from(err: csv::Error) -> Self {
        CropAdvisorError::Dataset(err.to_string())
    }
}

/// Convenience Result type for crop advisor operations
pub type Result<T> = std::result::Result<T, CropAdvisorError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| CropAdvisorError::Artifact(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| CropAdvisorError::Artifact(format!("{}: {}", f(), e)))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| CropAdvisorError::InvalidInput(msg.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| CropAdvisorError::InvalidInput(f()))
    }
}
