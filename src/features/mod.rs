//! Agronomic feature layout and request validation
//!
//! The classifier pipeline consumes exactly seven values in a fixed order.
//! That order is the column order used at training time and must never change
//! without retraining every artifact.

pub mod validator;

use serde::{Deserialize, Serialize};

pub use validator::{validate_input, ValidationError};

/// Number of input features
pub const NUM_FEATURES: usize = 7;

/// One input feature with its request key, dataset column and sanity range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSpec {
    /// Key in the JSON prediction request
    pub field: &'static str,
    /// Column name in the training CSV
    pub column: &'static str,
    /// Inclusive lower bound
    pub min: f64,
    /// Inclusive upper bound
    pub max: f64,
}

impl FeatureSpec {
    /// Check whether a value lies inside the inclusive range. NaN never does.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Feature layout in training-time column order
pub const FEATURES: [FeatureSpec; NUM_FEATURES] = [
    FeatureSpec { field: "nitrogen", column: "N", min: 0.0, max: 500.0 },
    FeatureSpec { field: "phosphorus", column: "P", min: 0.0, max: 500.0 },
    FeatureSpec { field: "potassium", column: "K", min: 0.0, max: 500.0 },
    FeatureSpec { field: "temperature", column: "temperature", min: -50.0, max: 60.0 },
    FeatureSpec { field: "humidity", column: "humidity", min: 0.0, max: 100.0 },
    FeatureSpec { field: "ph", column: "ph", min: 0.0, max: 14.0 },
    FeatureSpec { field: "rainfall", column: "rainfall", min: 0.0, max: 10000.0 },
];

/// Request keys in column order
pub fn required_fields() -> impl Iterator<Item = &'static str> {
    FEATURES.iter().map(|f| f.field)
}

/// Ordered feature vector {N, P, K, temperature, humidity, pH, rainfall}
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; NUM_FEATURES]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl From<[f64; NUM_FEATURES]> for FeatureVector {
    fn from(values: [f64; NUM_FEATURES]) -> Self {
        Self(values)
    }
}
