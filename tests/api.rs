//! HTTP contract tests driven in-process through the router

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crop_advisor::config::ServiceConfig;
use crop_advisor::model::artifacts::sha256_file_hex;
use crop_advisor::model::{
    load_components, write_json, Aggregation, ArtifactPaths, ArtifactSet, Classifier,
    DecisionTree, LabelEncoder, Node, StandardScaler, TreeEnsemble,
};
use crop_advisor::server::{router, AppState};
use crop_advisor::utils::Result;
use crop_advisor::{CropAdvisorError, NUM_FEATURES};

/// Nitrogen above 50 means rice, otherwise maize
fn nitrogen_forest() -> TreeEnsemble {
    TreeEnsemble {
        n_features: NUM_FEATURES,
        n_classes: 2,
        aggregation: Aggregation::Average,
        base_score: None,
        trees: vec![DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 50.0,
                    left: 1,
                    right: 2,
                },
                Node::Leaf(vec![1.0, 0.0]),
                Node::Leaf(vec![0.0, 1.0]),
            ],
        }],
    }
}

/// Always maize
fn constant_forest() -> TreeEnsemble {
    TreeEnsemble {
        n_features: NUM_FEATURES,
        n_classes: 2,
        aggregation: Aggregation::Average,
        base_score: None,
        trees: vec![DecisionTree {
            nodes: vec![Node::Leaf(vec![1.0, 0.0])],
        }],
    }
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn model_dir(&self) -> PathBuf {
        self.dir.path().join("models")
    }

    fn log_path(&self) -> PathBuf {
        self.dir.path().join("logs/predictions.log")
    }

    fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::for_version(&self.model_dir(), "1")
    }

    /// Write scaler, encoder and rf; optionally xgb
    fn write_artifacts(&self, with_xgb: bool) {
        let paths = self.paths();
        let scaler = StandardScaler {
            mean: vec![0.0; NUM_FEATURES],
            scale: vec![1.0; NUM_FEATURES],
        };
        write_json(&paths.scaler, &scaler).unwrap();
        write_json(&paths.encoder, &LabelEncoder::new(vec!["rice".into(), "maize".into()]))
            .unwrap();
        write_json(&paths.rf, &nitrogen_forest()).unwrap();
        if with_xgb {
            write_json(&paths.xgb, &constant_forest()).unwrap();
        }
    }

    fn config(&self) -> ServiceConfig {
        ServiceConfig {
            model_dir: self.model_dir(),
            model_version: "1".into(),
            prediction_log: self.log_path(),
            ..ServiceConfig::default()
        }
    }

    fn app(&self) -> Router {
        let artifacts = load_components(&self.model_dir(), "1");
        self.app_with(artifacts)
    }

    fn app_with(&self, artifacts: ArtifactSet) -> Router {
        router(Arc::new(AppState::new(self.config(), artifacts)))
    }

    fn log_lines(&self) -> usize {
        std::fs::read_to_string(self.log_path())
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }
}

fn reference_input() -> Value {
    json!({
        "nitrogen": 90,
        "phosphorus": 42,
        "potassium": 43,
        "temperature": 20.87,
        "humidity": 82.0,
        "ph": 6.5,
        "rainfall": 202.9
    })
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn post_raw(app: &Router, uri: &str, body: impl Into<String>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .unwrap();
    send(app, request).await
}

async fn post(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    post_raw(app, uri, body.to_string()).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn hashes(dir: &Path) -> BTreeMap<String, String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .map(|p| (p.display().to_string(), sha256_file_hex(&p).unwrap()))
        .collect()
}

#[tokio::test]
async fn test_home_and_api_alias() {
    let fx = Fixture::new();
    let app = fx.app();

    for uri in ["/", "/api"] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "service": "crop-prediction-api"}));
    }
}

#[tokio::test]
async fn test_health_reports_loaded_set() {
    let fx = Fixture::new();
    fx.write_artifacts(false);
    let app = fx.app();

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["metadata"]["version"], "1");
    assert!(body["metadata"]["loaded_at"].is_string());
    assert!(body["metadata"]["source_paths"]["rf"].is_string());
    assert_eq!(body["metadata"]["missing"], json!([]));
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_predict_reference_input() {
    let fx = Fixture::new();
    fx.write_artifacts(false);
    let app = fx.app();

    let (status, body) = post(&app, "/predict", &reference_input()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"prediction": "rice", "model": "rf", "model_version": "1"})
    );
    assert_eq!(fx.log_lines(), 1);

    let line = std::fs::read_to_string(fx.log_path()).unwrap();
    let record: Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(record["prediction"], "rice");
    assert_eq!(record["model"], "rf");
    assert_eq!(record["input"], reference_input());
}

#[tokio::test]
async fn test_predict_under_api_prefix() {
    let fx = Fixture::new();
    fx.write_artifacts(false);
    let app = fx.app();

    let mut input = reference_input();
    input["nitrogen"] = json!(10);
    let (status, body) = post(&app, "/api/predict", &input).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "maize");
}

#[tokio::test]
async fn test_xgb_falls_back_to_rf() {
    let fx = Fixture::new();
    fx.write_artifacts(false);
    let app = fx.app();

    let mut input = reference_input();
    input["model"] = json!("xgb");
    let (status, body) = post(&app, "/predict", &input).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "rf");
    assert_eq!(body["prediction"], "rice");
}

#[tokio::test]
async fn test_xgb_used_when_loaded() {
    let fx = Fixture::new();
    fx.write_artifacts(true);
    let app = fx.app();

    let mut input = reference_input();
    input["model"] = json!("XGB");
    let (status, body) = post(&app, "/predict", &input).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "xgb");
    assert_eq!(body["prediction"], "maize");
}

#[tokio::test]
async fn test_missing_scaler_is_mock_mode() {
    let fx = Fixture::new();
    fx.write_artifacts(false);
    std::fs::remove_file(fx.paths().scaler).unwrap();
    let app = fx.app();

    let (_, health) = get(&app, "/health").await;
    assert_eq!(health["model_loaded"], false);
    assert_eq!(health["metadata"]["missing"], json!(["scaler"]));

    let (status, body) = post(&app, "/predict", &reference_input()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("Models not found"));
    assert_eq!(fx.log_lines(), 0);
}

#[tokio::test]
async fn test_missing_encoder_is_mock_mode() {
    let fx = Fixture::new();
    fx.write_artifacts(false);
    std::fs::remove_file(fx.paths().encoder).unwrap();
    let app = fx.app();

    let (_, health) = get(&app, "/health").await;
    assert_eq!(health["model_loaded"], false);
    assert_eq!(health["metadata"]["missing"], json!(["encoder"]));

    let (status, body) = post(&app, "/predict", &reference_input()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("Models not found"));
    assert_eq!(fx.log_lines(), 0);
}

#[tokio::test]
async fn test_mock_mode_ignores_body() {
    let fx = Fixture::new();
    let app = fx.app();

    let (status, _) = post_raw(&app, "/predict", "{not json").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_validation_errors() {
    let fx = Fixture::new();
    fx.write_artifacts(false);
    let app = fx.app();

    let mut missing = reference_input();
    missing.as_object_mut().unwrap().remove("ph");
    let (status, body) = post(&app, "/predict", &missing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Missing field: ph"}));

    let mut non_numeric = reference_input();
    non_numeric["humidity"] = json!("wet");
    let (status, body) = post(&app, "/predict", &non_numeric).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid numeric value for humidity: wet");

    let mut out_of_range = reference_input();
    out_of_range["nitrogen"] = json!(500.0001);
    let (status, body) = post(&app, "/predict", &out_of_range).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "nitrogen out of expected range [0,500]");

    assert_eq!(fx.log_lines(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let fx = Fixture::new();
    fx.write_artifacts(false);
    let app = fx.app();

    let (status, body) = post_raw(&app, "/predict", "{\"nitrogen\": ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = post(&app, "/predict", &json!([1, 2, 3])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_body_parsed_without_json_content_type() {
    let fx = Fixture::new();
    fx.write_artifacts(false);
    let app = fx.app();

    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(reference_input().to_string()))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "rice");
}

#[derive(Debug)]
struct Broken;

impl Classifier for Broken {
    fn predict(&self, _features: &[f64]) -> Result<usize> {
        Err(CropAdvisorError::Artifact("corrupted tree".into()))
    }

    fn n_features(&self) -> usize {
        NUM_FEATURES
    }

    fn n_classes(&self) -> usize {
        2
    }
}

#[tokio::test]
async fn test_internal_error_is_bad_request() {
    let fx = Fixture::new();
    let artifacts = ArtifactSet::from_parts(
        "1",
        Some(Arc::new(Broken)),
        None,
        Some(Arc::new(StandardScaler {
            mean: vec![0.0; NUM_FEATURES],
            scale: vec![1.0; NUM_FEATURES],
        })),
        Some(Arc::new(LabelEncoder::new(vec!["rice".into()]))),
        BTreeMap::new(),
    );
    let app = fx.app_with(artifacts);

    let (status, body) = post(&app, "/predict", &reference_input()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Prediction failed"));
    assert_eq!(fx.log_lines(), 0);
}

#[tokio::test]
async fn test_log_failure_does_not_fail_request() {
    let fx = Fixture::new();
    fx.write_artifacts(false);
    let config = ServiceConfig {
        prediction_log: fx.dir.path().to_path_buf(),
        ..fx.config()
    };
    let app = router(Arc::new(AppState::new(
        config,
        load_components(&fx.model_dir(), "1"),
    )));

    let (status, body) = post(&app, "/predict", &reference_input()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "rice");
}

#[tokio::test]
async fn test_metadata_placeholder_without_manifest() {
    let fx = Fixture::new();
    fx.write_artifacts(false);
    let app = fx.app();

    let (status, body) = get(&app, "/metadata").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loaded"], true);
    assert_eq!(body["model_version"], "1");
    assert!(body["metrics"]["accuracy"].is_null());
    assert!(body["metrics"]["notes"].is_string());
    assert!(body["source_paths"]["scaler"].is_string());
}

#[tokio::test]
async fn test_retrain_requires_params() {
    let fx = Fixture::new();
    let app = fx.app();

    for body in [
        json!({}),
        json!({"dataset_path": "data.csv"}),
        json!({"dataset_path": "", "new_version": "2"}),
        json!({"dataset_path": "data.csv", "new_version": 2}),
    ] {
        let (status, response) = post(&app, "/retrain", &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response["error"],
            "Provide dataset_path and new_version in request body."
        );
    }

    let (status, _) = post_raw(&app, "/api/retrain", "garbage").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_retrain_has_no_side_effects() {
    let fx = Fixture::new();
    fx.write_artifacts(false);
    let app = fx.app();
    let before = hashes(&fx.model_dir());

    let request = json!({
        "dataset_path": "data/new.csv",
        "new_version": "2",
        "train_params": {"n_estimators": 200}
    });
    let (status, body) = post(&app, "/api/retrain", &request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "retrain_triggered");
    assert_eq!(body["requested_new_version"], "2");
    assert!(body["note"].is_string());

    assert_eq!(hashes(&fx.model_dir()), before);
    let (_, health) = get(&app, "/health").await;
    assert_eq!(health["metadata"]["version"], "1");
}
