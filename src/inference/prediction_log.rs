//! Append-only JSON-lines log of served predictions
//!
//! The file is opened, appended with a single write and closed per record.
//! Writers in other processes are not coordinated, so lines may interleave
//! under heavy concurrent load; a single service process is the intended setup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

use crate::model::ModelKind;
use crate::utils::{utc_timestamp, Result};

/// One served prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub timestamp: String,
    pub model: ModelKind,
    pub model_version: String,
    /// Request payload exactly as received
    pub input: serde_json::Value,
    pub prediction: String,
}

impl PredictionRecord {
    pub fn new(
        input: serde_json::Value,
        model: ModelKind,
        model_version: &str,
        prediction: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: utc_timestamp(),
            model,
            model_version: model_version.to_string(),
            input,
            prediction: prediction.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PredictionLogger {
    path: PathBuf,
}

impl PredictionLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, creating parent directories as needed
    pub async fn append(&self, record: &PredictionRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Append, downgrading any failure to a warning so the request still succeeds
    pub async fn record(&self, record: &PredictionRecord) {
        if let Err(e) = self.append(record).await {
            warn!("Failed to write prediction log {:?}: {}", self.path, e);
        }
    }
}
