//! Prediction request validation
//!
//! Three passes, each short-circuiting on the first failure in column order:
//! presence of every field, numeric conversion, then range checks.

use serde_json::{Map, Value};
use thiserror::Error;

use super::{FeatureVector, FEATURES, NUM_FEATURES};

/// Client-side input errors. All of these map to HTTP 400.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid numeric value for {field}: {value}")]
    InvalidNumericValue { field: &'static str, value: String },

    #[error("{field} out of expected range [{min},{max}]")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
}

impl ValidationError {
    /// Request key the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField(field) => field,
            ValidationError::InvalidNumericValue { field, .. } => field,
            ValidationError::OutOfRange { field, .. } => field,
        }
    }
}

/// Convert a JSON value to f64. Numbers pass through and strings are parsed
/// after trimming; null, booleans, arrays and objects are rejected.
fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Validate a prediction payload and return the ordered feature vector.
pub fn validate_input(data: &Map<String, Value>) -> Result<FeatureVector, ValidationError> {
    for spec in FEATURES.iter() {
        if !data.contains_key(spec.field) {
            return Err(ValidationError::MissingField(spec.field));
        }
    }

    let mut values = [0.0f64; NUM_FEATURES];
    for (slot, spec) in values.iter_mut().zip(FEATURES.iter()) {
        let raw = &data[spec.field];
        *slot = to_number(raw).ok_or_else(|| ValidationError::InvalidNumericValue {
            field: spec.field,
            value: match raw {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        })?;
    }

    for (&value, spec) in values.iter().zip(FEATURES.iter()) {
        if !spec.contains(value) {
            return Err(ValidationError::OutOfRange {
                field: spec.field,
                min: spec.min,
                max: spec.max,
                value,
            });
        }
    }

    Ok(FeatureVector(values))
}
