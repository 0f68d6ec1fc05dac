//! Crop Advisor CLI
//!
//! Serves the prediction API, trains new artifact versions and runs one-off
//! predictions against an artifact directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crop_advisor::config::{ServiceConfig, TrainConfig};
use crop_advisor::features::validate_input;
use crop_advisor::inference::Predictor;
use crop_advisor::model::{load_components, ModelKind};
use crop_advisor::server::{router, AppState};
use crop_advisor::utils::logging::{init_logging, LogConfig};
use crop_advisor::utils::format_duration;

/// Crop recommendation service
#[derive(Parser, Debug)]
#[command(name = "crop_advisor")]
#[command(version)]
#[command(about = "Crop recommendation from soil and climate readings", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP prediction service
    Serve {
        /// Directory containing versioned artifacts
        #[arg(long, env = "MODEL_DIR", default_value = "models")]
        model_dir: PathBuf,

        /// Artifact version to load
        #[arg(long, env = "MODEL_VERSION", default_value = "1")]
        model_version: String,

        /// JSON-lines prediction log
        #[arg(long, env = "PREDICTION_LOG", default_value = "logs/predictions.log")]
        prediction_log: PathBuf,

        /// Host to bind to
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "5000")]
        port: u16,
    },

    /// Train a random forest and write a new artifact version
    Train {
        /// CSV with N,P,K,temperature,humidity,ph,rainfall,label columns
        #[arg(short, long, default_value = "data/Crop_recommendation.csv")]
        dataset: PathBuf,

        /// Output directory for artifacts
        #[arg(short, long, env = "MODEL_DIR", default_value = "models")]
        model_dir: PathBuf,

        /// Version stamped into the artifact file names
        #[arg(long, default_value = "1")]
        model_version: String,

        /// Number of trees
        #[arg(long, default_value = "100")]
        n_trees: usize,

        /// Maximum tree depth (unbounded when omitted)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Minimum samples required to split a node
        #[arg(long, default_value = "2")]
        min_samples_split: usize,

        /// Held-out fraction for evaluation (0.0-1.0)
        #[arg(long, default_value = "0.2")]
        test_fraction: f64,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Predict a crop offline from an artifact directory
    Predict {
        /// Request body as JSON, e.g. '{"nitrogen":90,...}'
        #[arg(short, long, conflicts_with_all = ["nitrogen", "phosphorus", "potassium", "temperature", "humidity", "ph", "rainfall"])]
        input: Option<String>,

        #[arg(long)]
        nitrogen: Option<f64>,
        #[arg(long)]
        phosphorus: Option<f64>,
        #[arg(long)]
        potassium: Option<f64>,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        humidity: Option<f64>,
        #[arg(long)]
        ph: Option<f64>,
        #[arg(long)]
        rainfall: Option<f64>,

        /// Classifier to use: rf or xgb
        #[arg(long, default_value = "rf")]
        model: String,

        /// Directory containing versioned artifacts
        #[arg(long, env = "MODEL_DIR", default_value = "models")]
        model_dir: PathBuf,

        /// Artifact version to load
        #[arg(long, env = "MODEL_VERSION", default_value = "1")]
        model_version: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let serving = matches!(cli.command, Commands::Serve { .. });
    let log_config = LogConfig::for_command(cli.verbose, serving);

    let _ = init_logging(&log_config);

    match cli.command {
        Commands::Serve {
            model_dir,
            model_version,
            prediction_log,
            host,
            port,
        } => {
            let config = ServiceConfig {
                model_dir,
                model_version,
                prediction_log,
                host,
                port,
            };
            cmd_serve(config).await?;
        }

        Commands::Train {
            dataset,
            model_dir,
            model_version,
            n_trees,
            max_depth,
            min_samples_split,
            test_fraction,
            seed,
        } => {
            let config = TrainConfig {
                dataset_path: dataset,
                model_dir,
                version: model_version,
                n_trees,
                max_depth,
                min_samples_split,
                test_fraction,
                seed,
            };
            cmd_train(&config)?;
        }

        Commands::Predict {
            input,
            nitrogen,
            phosphorus,
            potassium,
            temperature,
            humidity,
            ph,
            rainfall,
            model,
            model_dir,
            model_version,
        } => {
            let mut data = match input {
                Some(raw) => match serde_json::from_str::<Value>(&raw)
                    .context("--input is not valid JSON")?
                {
                    Value::Object(map) => map,
                    _ => bail!("--input must be a JSON object"),
                },
                None => {
                    let mut map = Map::new();
                    for (field, value) in [
                        ("nitrogen", nitrogen),
                        ("phosphorus", phosphorus),
                        ("potassium", potassium),
                        ("temperature", temperature),
                        ("humidity", humidity),
                        ("ph", ph),
                        ("rainfall", rainfall),
                    ] {
                        if let Some(v) = value {
                            map.insert(field.to_string(), Value::from(v));
                        }
                    }
                    map
                }
            };
            data.entry("model").or_insert(Value::String(model));
            cmd_predict(&data, &model_dir, &model_version)?;
        }
    }

    Ok(())
}

async fn cmd_serve(config: ServiceConfig) -> Result<()> {
    info!("Crop Advisor v{}", crop_advisor::VERSION);
    info!("Configuration:");
    info!("  Model dir:      {:?}", config.model_dir);
    info!("  Model version:  {}", config.model_version);
    info!("  Prediction log: {:?}", config.prediction_log);

    std::fs::create_dir_all(&config.model_dir)
        .with_context(|| format!("creating model dir {:?}", config.model_dir))?;

    let artifacts = load_components(&config.model_dir, &config.model_version);
    if !artifacts.is_loaded() {
        warn!(
            "Running in mock mode: /predict will answer 500 until artifacts for version {} are present",
            config.model_version
        );
    }

    let addr = config.bind_addr()?;
    let state = Arc::new(AppState::new(config, artifacts));
    let app = router(state);

    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn cmd_train(config: &TrainConfig) -> Result<()> {
    println!("{}", "Training random forest".cyan().bold());
    println!("  Dataset: {:?}", config.dataset_path);
    println!("  Trees:   {}", config.n_trees);
    println!("  Seed:    {}", config.seed);
    println!();

    let report = crop_advisor::train(config)?;

    let fmt_metric = |m: Option<f64>| m.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v));

    println!("{}", "Training complete".green().bold());
    println!("  Version:   {}", report.version);
    println!("  Classes:   {}", report.classes.len());
    println!("  Accuracy:  {}", fmt_metric(report.metrics.accuracy));
    println!("  Macro F1:  {}", fmt_metric(report.metrics.f1_score));
    println!("  Duration:  {}", format_duration(report.duration_secs));
    println!("  Manifest:  {:?}", report.manifest_path);
    Ok(())
}

fn cmd_predict(data: &Map<String, Value>, model_dir: &std::path::Path, version: &str) -> Result<()> {
    let predictor = Predictor::new(load_components(model_dir, version));
    let features = validate_input(data)?;
    let requested = ModelKind::from_request(data.get("model"));
    let outcome = predictor.predict(&features, requested)?;

    println!(
        "{} {} ({} v{})",
        "Prediction:".green().bold(),
        outcome.prediction,
        outcome.model,
        outcome.model_version
    );
    Ok(())
}
