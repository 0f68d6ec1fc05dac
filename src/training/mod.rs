//! Offline training pipeline
//!
//! Produces a complete artifact set for one version from a labelled CSV:
//!
//! 1. Load [`CropRecord`]s and fit a [`LabelEncoder`] on every label
//! 2. Split rows with a seeded shuffle
//! 3. Fit a [`StandardScaler`] on the training rows and scale both splits
//! 4. Fit the random forest, evaluate it on the held-out rows
//! 5. Write scaler, encoder, forest and a manifest with digests and metrics

pub mod dataset;
pub mod forest;
pub mod metrics;

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::TrainConfig;
use crate::model::artifacts::{ENCODER_KEY, SCALER_KEY};
use crate::model::{
    write_json, ArtifactManifest, ArtifactPaths, Classifier, FeatureScaler, LabelEncoder,
    ModelKind, StandardScaler, TrainingMetrics,
};
use crate::utils::{utc_timestamp, CropAdvisorError, Result};

pub use dataset::{load_csv, read_records, train_test_split, CropRecord, TrainTestSplit};
pub use forest::{fit_random_forest, ForestParams};
pub use metrics::ConfusionMatrix;

/// What a training run produced
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub version: String,
    pub classes: Vec<String>,
    pub metrics: TrainingMetrics,
    pub paths: ArtifactPaths,
    pub manifest_path: PathBuf,
    pub duration_secs: f64,
}

/// Train and persist a full artifact set as described by `config`
pub fn train(config: &TrainConfig) -> Result<TrainingReport> {
    config.validate()?;
    let start = Instant::now();

    let records = load_csv(&config.dataset_path)?;
    let encoder = LabelEncoder::fit(records.iter().map(|r| r.label.as_str()));
    info!("Found {} classes: {:?}", encoder.len(), encoder.classes);

    let labels = records
        .iter()
        .map(|r| {
            encoder.transform(&r.label).ok_or_else(|| {
                CropAdvisorError::Training(format!("label '{}' missing from encoder", r.label))
            })
        })
        .collect::<Result<Vec<usize>>>()?;
    let rows: Vec<Vec<f64>> = records.iter().map(|r| r.features().0.to_vec()).collect();

    let split = train_test_split(rows.len(), config.test_fraction, config.seed);
    info!(
        "Split: {} training rows, {} test rows",
        split.train.len(),
        split.test.len()
    );

    let select = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<usize>) {
        idx.iter().map(|&i| (rows[i].clone(), labels[i])).unzip()
    };
    let (train_x, train_y) = select(&split.train);
    let (test_x, test_y) = select(&split.test);

    let scaler = StandardScaler::fit(&train_x)?;
    let scale_all = |x: &[Vec<f64>]| -> Result<Vec<Vec<f64>>> {
        x.iter().map(|row| scaler.transform(row)).collect()
    };
    let train_x = scale_all(&train_x)?;
    let test_x = scale_all(&test_x)?;

    let params = ForestParams {
        n_trees: config.n_trees,
        max_depth: config.max_depth,
        min_samples_split: config.min_samples_split,
        max_features: None,
        seed: config.seed,
    };
    info!("Fitting random forest with {} trees", params.n_trees);
    let forest = fit_random_forest(&train_x, &train_y, encoder.len(), &params)?;

    let mut metrics = TrainingMetrics {
        training_date: Some(utc_timestamp()),
        train_samples: Some(train_x.len()),
        test_samples: Some(test_x.len()),
        ..TrainingMetrics::default()
    };
    if test_x.is_empty() {
        warn!("Empty test split, skipping evaluation");
        metrics.notes = Some("No held-out rows; metrics not computed".to_string());
    } else {
        let predictions = test_x
            .iter()
            .map(|row| forest.predict(row))
            .collect::<Result<Vec<usize>>>()?;
        let cm = ConfusionMatrix::from_predictions(&predictions, &test_y, encoder.len());
        metrics.accuracy = Some(cm.accuracy());
        metrics.f1_score = Some(cm.macro_f1());
        info!(
            "Test accuracy {:.4}, macro F1 {:.4}",
            cm.accuracy(),
            cm.macro_f1()
        );
    }

    let paths = ArtifactPaths::for_version(&config.model_dir, &config.version);
    write_json(&paths.scaler, &scaler)?;
    write_json(&paths.encoder, &encoder)?;
    write_json(&paths.rf, &forest)?;

    let mut manifest = ArtifactManifest::new(&config.version);
    manifest.register(SCALER_KEY, &config.model_dir, &paths.scaler)?;
    manifest.register(ENCODER_KEY, &config.model_dir, &paths.encoder)?;
    manifest.register(ModelKind::RandomForest.as_str(), &config.model_dir, &paths.rf)?;
    manifest.metrics = metrics.clone();
    let manifest_path = manifest.save(&config.model_dir)?;

    let duration_secs = start.elapsed().as_secs_f64();
    info!(
        "Artifacts for version {} written to {:?}",
        config.version, config.model_dir
    );

    Ok(TrainingReport {
        version: config.version.clone(),
        classes: encoder.classes,
        metrics,
        paths,
        manifest_path,
        duration_secs,
    })
}
