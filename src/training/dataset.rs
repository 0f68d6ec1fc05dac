//! Crop recommendation dataset loading and train/test splitting
//!
//! The CSV has one row per field observation:
//!
//! ```text
//! N,P,K,temperature,humidity,ph,rainfall,label
//! 90,42,43,20.87,82.00,6.50,202.93,rice
//! ```
//!
//! Extra columns are ignored. The split is a seeded shuffle, so the same seed
//! always produces the same held-out set.

use std::io::Read;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::features::{FeatureVector, NUM_FEATURES};
use crate::utils::{CropAdvisorError, Result};

/// One labelled observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRecord {
    #[serde(rename = "N")]
    pub nitrogen: f64,
    #[serde(rename = "P")]
    pub phosphorus: f64,
    #[serde(rename = "K")]
    pub potassium: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
    pub label: String,
}

impl CropRecord {
    /// Features in training column order
    pub fn features(&self) -> FeatureVector {
        FeatureVector([
            self.nitrogen,
            self.phosphorus,
            self.potassium,
            self.temperature,
            self.humidity,
            self.ph,
            self.rainfall,
        ])
    }
}

/// Parse records from any CSV source
pub fn read_records<R: Read>(reader: R) -> Result<Vec<CropRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (row, result) in rdr.deserialize::<CropRecord>().enumerate() {
        let record = result.map_err(|e| {
            CropAdvisorError::Dataset(format!("row {}: {}", row + 1, e))
        })?;
        if record.features().0.iter().any(|v| !v.is_finite()) {
            return Err(CropAdvisorError::Dataset(format!(
                "row {}: non-finite feature value",
                row + 1
            )));
        }
        records.push(record);
    }

    if records.is_empty() {
        return Err(CropAdvisorError::Dataset("dataset contains no rows".into()));
    }
    Ok(records)
}

/// Load the dataset CSV from disk
pub fn load_csv(path: &Path) -> Result<Vec<CropRecord>> {
    if !path.exists() {
        return Err(CropAdvisorError::PathNotFound(path.to_path_buf()));
    }
    info!("Loading data from {:?}", path);
    let file = std::fs::File::open(path)?;
    let records = read_records(file)?;
    info!("Loaded {} rows with {} features", records.len(), NUM_FEATURES);
    Ok(records)
}

/// Index split into training and held-out rows
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with a seeded RNG and hold out `ceil(n * test_fraction)` rows.
/// At least one row always stays in the training split.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> TrainTestSplit {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    let n_test = n_test.min(n.saturating_sub(1));

    let train = indices.split_off(n_test);
    TrainTestSplit {
        train,
        test: indices,
    }
}
