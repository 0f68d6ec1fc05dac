//! Versioned artifact loading
//!
//! Artifacts for a version `v` live in one directory:
//!
//! ```text
//! models/
//! ├── manifest-v1.json        (optional registry: paths, sha256, metrics)
//! ├── rf_model-v1.json
//! ├── xgb_model-v1.json
//! ├── scaler-v1.json
//! └── label_encoder-v1.json
//! ```
//!
//! With a manifest, exactly the listed files are loaded and their digests are
//! verified. Without one, each template is tried and absent files are skipped.
//! Any failure yields an empty, not-loaded [`ArtifactSet`] instead of an error,
//! so a bad artifact degrades the service to mock mode rather than stopping it.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};

use super::{
    read_json, write_json, Classifier, FeatureScaler, LabelDecoder, LabelEncoder, ModelKind,
    StandardScaler, TreeEnsemble,
};
use crate::features::NUM_FEATURES;
use crate::utils::{utc_timestamp, CropAdvisorError, Result};

pub const RF_MODEL_TEMPLATE: &str = "rf_model-v{version}.json";
pub const XGB_MODEL_TEMPLATE: &str = "xgb_model-v{version}.json";
pub const SCALER_TEMPLATE: &str = "scaler-v{version}.json";
pub const ENCODER_TEMPLATE: &str = "label_encoder-v{version}.json";
pub const MANIFEST_TEMPLATE: &str = "manifest-v{version}.json";

/// Artifact keys used in manifests and `source_paths`
pub const SCALER_KEY: &str = "scaler";
pub const ENCODER_KEY: &str = "encoder";

fn render(template: &str, version: &str) -> String {
    template.replace("{version}", version)
}

/// Resolved file locations for one version
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub rf: PathBuf,
    pub xgb: PathBuf,
    pub scaler: PathBuf,
    pub encoder: PathBuf,
}

impl ArtifactPaths {
    pub fn for_version(model_dir: &Path, version: &str) -> Self {
        Self {
            rf: model_dir.join(render(RF_MODEL_TEMPLATE, version)),
            xgb: model_dir.join(render(XGB_MODEL_TEMPLATE, version)),
            scaler: model_dir.join(render(SCALER_TEMPLATE, version)),
            encoder: model_dir.join(render(ENCODER_TEMPLATE, version)),
        }
    }

    pub fn manifest(model_dir: &Path, version: &str) -> PathBuf {
        model_dir.join(render(MANIFEST_TEMPLATE, version))
    }
}

/// Training metrics carried in the manifest and surfaced by `/metadata`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub accuracy: Option<f64>,
    pub f1_score: Option<f64>,
    pub training_date: Option<String>,
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_samples: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_samples: Option<usize>,
}

impl TrainingMetrics {
    /// Placeholder reported when no manifest exists
    pub fn placeholder() -> Self {
        Self {
            notes: Some(
                "Populate with real training metadata after training pipeline runs".to_string(),
            ),
            ..Self::default()
        }
    }
}

/// One manifest entry. `path` is relative to the model directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Explicit registry of the artifacts making up one version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: String,
    pub created_at: String,
    pub artifacts: BTreeMap<String, ArtifactEntry>,
    #[serde(default)]
    pub metrics: TrainingMetrics,
}

impl ArtifactManifest {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            created_at: utc_timestamp(),
            artifacts: BTreeMap::new(),
            metrics: TrainingMetrics::default(),
        }
    }

    /// Register a file already written under `model_dir`, recording its digest
    pub fn register(&mut self, key: &str, model_dir: &Path, file: &Path) -> Result<()> {
        let relative = file
            .strip_prefix(model_dir)
            .unwrap_or(file)
            .to_string_lossy()
            .to_string();
        let sha256 = sha256_file_hex(file)?;
        self.artifacts.insert(
            key.to_string(),
            ArtifactEntry {
                path: relative,
                sha256: Some(sha256),
            },
        );
        Ok(())
    }

    pub fn save(&self, model_dir: &Path) -> Result<PathBuf> {
        let path = ArtifactPaths::manifest(model_dir, &self.version);
        write_json(&path, self)?;
        info!("Manifest saved to {:?}", path);
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

/// Hex-encoded SHA-256 of a file, streamed in 8 KiB chunks
pub fn sha256_file_hex(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

/// Load report exposed through `/health`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadMetadata {
    pub version: String,
    pub loaded: bool,
    pub loaded_at: Option<String>,
    pub source_paths: BTreeMap<String, String>,
    /// Required artifacts that are absent (scaler, encoder, classifier)
    pub missing: Vec<String>,
}

/// The artifacts of one version. Immutable once built.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub rf: Option<Arc<dyn Classifier>>,
    pub xgb: Option<Arc<dyn Classifier>>,
    pub scaler: Option<Arc<dyn FeatureScaler>>,
    pub encoder: Option<Arc<dyn LabelDecoder>>,
    pub metadata: LoadMetadata,
    pub metrics: Option<TrainingMetrics>,
}

impl ArtifactSet {
    /// Set with nothing loaded
    pub fn empty(version: &str) -> Self {
        Self::from_parts(version, None, None, None, None, BTreeMap::new())
    }

    /// Assemble a set from already-built components and derive the load report.
    /// A set counts as loaded only with scaler, encoder and at least one classifier.
    pub fn from_parts(
        version: &str,
        rf: Option<Arc<dyn Classifier>>,
        xgb: Option<Arc<dyn Classifier>>,
        scaler: Option<Arc<dyn FeatureScaler>>,
        encoder: Option<Arc<dyn LabelDecoder>>,
        source_paths: BTreeMap<String, String>,
    ) -> Self {
        let mut missing = Vec::new();
        if scaler.is_none() {
            missing.push(SCALER_KEY.to_string());
        }
        if encoder.is_none() {
            missing.push(ENCODER_KEY.to_string());
        }
        if rf.is_none() && xgb.is_none() {
            missing.push("classifier".to_string());
        }

        let loaded = missing.is_empty();
        Self {
            rf,
            xgb,
            scaler,
            encoder,
            metadata: LoadMetadata {
                version: version.to_string(),
                loaded,
                loaded_at: loaded.then(utc_timestamp),
                source_paths,
                missing,
            },
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: TrainingMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.metadata.loaded
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    pub fn classifier(&self, kind: ModelKind) -> Option<&Arc<dyn Classifier>> {
        match kind {
            ModelKind::RandomForest => self.rf.as_ref(),
            ModelKind::Xgb => self.xgb.as_ref(),
        }
    }

    /// Reject combinations that would fail on every request
    fn check_shapes(&self) -> Result<()> {
        if let Some(scaler) = &self.scaler {
            if scaler.n_features() != NUM_FEATURES {
                return Err(CropAdvisorError::Artifact(format!(
                    "scaler expects {} features, service provides {}",
                    scaler.n_features(),
                    NUM_FEATURES
                )));
            }
        }
        for kind in [ModelKind::RandomForest, ModelKind::Xgb] {
            let Some(model) = self.classifier(kind) else {
                continue;
            };
            if model.n_features() != NUM_FEATURES {
                return Err(CropAdvisorError::Artifact(format!(
                    "{} classifier expects {} features, service provides {}",
                    kind,
                    model.n_features(),
                    NUM_FEATURES
                )));
            }
            if let Some(encoder) = &self.encoder {
                if encoder.classes().len() < model.n_classes() {
                    return Err(CropAdvisorError::Artifact(format!(
                        "{} classifier has {} classes but encoder knows {}",
                        kind,
                        model.n_classes(),
                        encoder.classes().len()
                    )));
                }
            }
        }
        Ok(())
    }
}

fn load_ensemble(path: &Path) -> Result<Arc<dyn Classifier>> {
    let model: TreeEnsemble = read_json(path)?;
    model.validate()?;
    Ok(Arc::new(model))
}

fn load_scaler(path: &Path) -> Result<Arc<dyn FeatureScaler>> {
    let scaler: StandardScaler = read_json(path)?;
    scaler.validate()?;
    Ok(Arc::new(scaler))
}

fn load_encoder(path: &Path) -> Result<Arc<dyn LabelDecoder>> {
    let encoder: LabelEncoder = read_json(path)?;
    encoder.validate()?;
    Ok(Arc::new(encoder))
}

/// Components read from disk before the set is assembled
#[derive(Default)]
struct Components {
    rf: Option<Arc<dyn Classifier>>,
    xgb: Option<Arc<dyn Classifier>>,
    scaler: Option<Arc<dyn FeatureScaler>>,
    encoder: Option<Arc<dyn LabelDecoder>>,
    source_paths: BTreeMap<String, String>,
}

impl Components {
    fn load(&mut self, key: &str, path: &Path) -> Result<()> {
        match key {
            "rf" => self.rf = Some(load_ensemble(path)?),
            "xgb" => self.xgb = Some(load_ensemble(path)?),
            SCALER_KEY => self.scaler = Some(load_scaler(path)?),
            ENCODER_KEY => self.encoder = Some(load_encoder(path)?),
            other => {
                warn!("Ignoring unknown artifact '{}' at {:?}", other, path);
                return Ok(());
            }
        }
        info!("Loaded {} from {:?}", key, path);
        self.source_paths
            .insert(key.to_string(), path.display().to_string());
        Ok(())
    }

    fn into_set(self, version: &str) -> ArtifactSet {
        ArtifactSet::from_parts(
            version,
            self.rf,
            self.xgb,
            self.scaler,
            self.encoder,
            self.source_paths,
        )
    }
}

fn load_from_templates(model_dir: &Path, version: &str) -> Result<ArtifactSet> {
    let paths = ArtifactPaths::for_version(model_dir, version);
    let mut components = Components::default();

    for (key, path) in [
        (ModelKind::RandomForest.as_str(), &paths.rf),
        (ModelKind::Xgb.as_str(), &paths.xgb),
        (SCALER_KEY, &paths.scaler),
        (ENCODER_KEY, &paths.encoder),
    ] {
        if path.exists() {
            components.load(key, path)?;
        }
    }

    Ok(components.into_set(version))
}

fn load_from_manifest(model_dir: &Path, version: &str, manifest_path: &Path) -> Result<ArtifactSet> {
    let manifest = ArtifactManifest::load(manifest_path)?;
    if manifest.version != version {
        return Err(CropAdvisorError::Artifact(format!(
            "manifest {:?} describes version '{}', expected '{}'",
            manifest_path, manifest.version, version
        )));
    }

    let mut components = Components::default();
    for (key, entry) in &manifest.artifacts {
        let path = model_dir.join(&entry.path);
        if !path.exists() {
            return Err(CropAdvisorError::PathNotFound(path));
        }
        if let Some(expected) = &entry.sha256 {
            let actual = sha256_file_hex(&path)?;
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(CropAdvisorError::Checksum {
                    path,
                    expected: expected.clone(),
                    actual,
                });
            }
        }
        components.load(key, &path)?;
    }

    Ok(components.into_set(version).with_metrics(manifest.metrics))
}

fn try_load(model_dir: &Path, version: &str) -> Result<ArtifactSet> {
    let manifest_path = ArtifactPaths::manifest(model_dir, version);
    let set = if manifest_path.exists() {
        info!("Loading version {} from manifest {:?}", version, manifest_path);
        load_from_manifest(model_dir, version, &manifest_path)?
    } else {
        load_from_templates(model_dir, version)?
    };
    set.check_shapes()?;
    Ok(set)
}

/// Load every available artifact for `version`. Never fails: errors are logged
/// and produce an empty set, which puts the service in mock mode.
pub fn load_components(model_dir: &Path, version: &str) -> ArtifactSet {
    match try_load(model_dir, version) {
        Ok(set) => {
            if !set.is_loaded() {
                warn!(
                    "Artifacts for version {} incomplete, missing: {}",
                    version,
                    set.metadata.missing.join(", ")
                );
            }
            set
        }
        Err(e) => {
            error!("Error loading components for version {}: {}", version, e);
            ArtifactSet::empty(version)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Aggregation, DecisionTree, Node};
    use tempfile::TempDir;

    fn tiny_forest(n_classes: usize) -> TreeEnsemble {
        let mut left = vec![0.0; n_classes];
        left[0] = 1.0;
        let mut right = vec![0.0; n_classes];
        right[n_classes - 1] = 1.0;
        TreeEnsemble {
            n_features: NUM_FEATURES,
            n_classes,
            aggregation: Aggregation::Average,
            base_score: None,
            trees: vec![DecisionTree {
                nodes: vec![
                    Node::Split {
                        feature: 0,
                        threshold: 0.0,
                        left: 1,
                        right: 2,
                    },
                    Node::Leaf(left),
                    Node::Leaf(right),
                ],
            }],
        }
    }

    fn write_full_set(dir: &Path, version: &str) -> ArtifactPaths {
        let paths = ArtifactPaths::for_version(dir, version);
        write_json(&paths.rf, &tiny_forest(2)).unwrap();
        write_json(
            &paths.scaler,
            &StandardScaler {
                mean: vec![0.0; NUM_FEATURES],
                scale: vec![1.0; NUM_FEATURES],
            },
        )
        .unwrap();
        write_json(&paths.encoder, &LabelEncoder::fit(["maize", "rice"])).unwrap();
        paths
    }

    #[test]
    fn test_paths_interpolate_version() {
        let paths = ArtifactPaths::for_version(Path::new("models"), "3");
        assert_eq!(paths.rf, PathBuf::from("models/rf_model-v3.json"));
        assert_eq!(paths.encoder, PathBuf::from("models/label_encoder-v3.json"));
        assert_eq!(
            ArtifactPaths::manifest(Path::new("models"), "3"),
            PathBuf::from("models/manifest-v3.json")
        );
    }

    #[test]
    fn test_empty_dir_is_mock_mode() {
        let dir = TempDir::new().unwrap();
        let set = load_components(dir.path(), "1");
        assert!(!set.is_loaded());
        assert_eq!(set.metadata.missing, vec!["scaler", "encoder", "classifier"]);
        assert!(set.metadata.loaded_at.is_none());
    }

    #[test]
    fn test_full_template_set_loads() {
        let dir = TempDir::new().unwrap();
        write_full_set(dir.path(), "1");
        let set = load_components(dir.path(), "1");
        assert!(set.is_loaded());
        assert!(set.rf.is_some());
        assert!(set.xgb.is_none());
        assert!(set.metadata.loaded_at.is_some());
        assert_eq!(set.metadata.source_paths.len(), 3);
        assert!(set.metrics.is_none());
    }

    #[test]
    fn test_other_version_not_picked_up() {
        let dir = TempDir::new().unwrap();
        write_full_set(dir.path(), "1");
        assert!(!load_components(dir.path(), "2").is_loaded());
    }

    #[test]
    fn test_classifier_without_scaler_is_not_loaded() {
        let dir = TempDir::new().unwrap();
        let paths = write_full_set(dir.path(), "1");
        fs::remove_file(&paths.scaler).unwrap();
        let set = load_components(dir.path(), "1");
        assert!(!set.is_loaded());
        assert!(set.rf.is_some());
        assert_eq!(set.metadata.missing, vec!["scaler"]);
    }

    #[test]
    fn test_corrupt_artifact_yields_empty_set() {
        let dir = TempDir::new().unwrap();
        let paths = write_full_set(dir.path(), "1");
        fs::write(&paths.rf, "{ broken").unwrap();
        let set = load_components(dir.path(), "1");
        assert!(!set.is_loaded());
        assert!(set.rf.is_none());
        assert!(set.scaler.is_none());
        assert!(set.metadata.source_paths.is_empty());
    }

    #[test]
    fn test_encoder_smaller_than_classifier_rejected() {
        let dir = TempDir::new().unwrap();
        let paths = write_full_set(dir.path(), "1");
        write_json(&paths.rf, &tiny_forest(3)).unwrap();
        assert!(!load_components(dir.path(), "1").is_loaded());
    }

    #[test]
    fn test_manifest_load_and_metrics() {
        let dir = TempDir::new().unwrap();
        let paths = write_full_set(dir.path(), "1");
        let mut manifest = ArtifactManifest::new("1");
        manifest.register("rf", dir.path(), &paths.rf).unwrap();
        manifest.register(SCALER_KEY, dir.path(), &paths.scaler).unwrap();
        manifest.register(ENCODER_KEY, dir.path(), &paths.encoder).unwrap();
        manifest.metrics.accuracy = Some(0.97);
        manifest.save(dir.path()).unwrap();

        let set = load_components(dir.path(), "1");
        assert!(set.is_loaded());
        assert_eq!(set.metrics.unwrap().accuracy, Some(0.97));
    }

    #[test]
    fn test_manifest_checksum_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let paths = write_full_set(dir.path(), "1");
        let mut manifest = ArtifactManifest::new("1");
        manifest.register("rf", dir.path(), &paths.rf).unwrap();
        manifest.register(SCALER_KEY, dir.path(), &paths.scaler).unwrap();
        manifest.register(ENCODER_KEY, dir.path(), &paths.encoder).unwrap();
        manifest.save(dir.path()).unwrap();

        // Tamper after the digest was recorded
        write_json(&paths.encoder, &LabelEncoder::fit(["beans", "rice"])).unwrap();
        assert!(!load_components(dir.path(), "1").is_loaded());
    }

    #[test]
    fn test_manifest_takes_precedence_over_templates() {
        let dir = TempDir::new().unwrap();
        let paths = write_full_set(dir.path(), "1");
        // Manifest lists only the classifier, so the set is partial
        let mut manifest = ArtifactManifest::new("1");
        manifest.register("rf", dir.path(), &paths.rf).unwrap();
        manifest.save(dir.path()).unwrap();

        let set = load_components(dir.path(), "1");
        assert!(!set.is_loaded());
        assert_eq!(set.metadata.missing, vec!["scaler", "encoder"]);
    }

    #[test]
    fn test_sha256_known_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.txt");
        fs::write(&path, "abc").unwrap();
        assert_eq!(
            sha256_file_hex(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
