//! Standard scaler: zero mean, unit variance per feature

use serde::{Deserialize, Serialize};

use super::FeatureScaler;
use crate::utils::{CropAdvisorError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on row-major samples. Uses the population standard deviation; a
    /// constant column gets scale 1 so it passes through centred.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows
            .first()
            .ok_or_else(|| CropAdvisorError::Training("cannot fit scaler on zero rows".into()))?;
        let n_features = first.len();
        if rows.iter().any(|r| r.len() != n_features) {
            return Err(CropAdvisorError::Training("ragged feature rows".into()));
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; n_features];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; n_features];
        for row in rows {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m) * (x - m);
            }
        }

        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > 0.0 {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    /// Check that both vectors agree in length and hold usable numbers
    pub fn validate(&self) -> Result<()> {
        if self.mean.len() != self.scale.len() {
            return Err(CropAdvisorError::Artifact(format!(
                "scaler mean has {} entries but scale has {}",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err(CropAdvisorError::Artifact(
                "scaler contains non-finite values".into(),
            ));
        }
        Ok(())
    }
}

impl FeatureScaler for StandardScaler {
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.mean.len() {
            return Err(CropAdvisorError::InvalidInput(format!(
                "scaler expects {} features, got {}",
                self.mean.len(),
                features.len()
            )));
        }

        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| {
                let s = if *s == 0.0 { 1.0 } else { *s };
                (x - m) / s
            })
            .collect())
    }

    fn n_features(&self) -> usize {
        self.mean.len()
    }
}
