//! flightfare CLI Module
//!
//! Command-line interface for running the training pipeline, loading source
//! data into the document store, and predicting with a trained model.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::inference::FareModel;
use crate::pipeline::{PipelineOutcome, TrainingPipeline};
use crate::store::{push_csv_file, FileDocumentStore};
use crate::utils::{read_csv, write_csv};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "FLIGHTFARE_CONFIG";
/// Configuration file used when neither flag nor environment names one
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.yaml";

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn kv(key: &str, val: &str) {
    println!("  {:<22} {}", muted(key), val.white());
}

#[derive(Parser)]
#[command(name = "flightfare")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Batch training pipeline for flight-fare regression models")]
#[command(long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full training pipeline (default)
    Train,

    /// Load a CSV file into the document store
    Push {
        /// CSV file with a header row
        #[arg(short, long)]
        file: PathBuf,

        /// Database name (defaults to the configured one)
        #[arg(long)]
        database: Option<String>,

        /// Collection name (defaults to the configured one)
        #[arg(long)]
        collection: Option<String>,
    },

    /// Predict fares for a CSV file with a trained model bundle
    Predict {
        /// Trained model bundle (model.bin)
        #[arg(short, long)]
        model: PathBuf,

        /// CSV file of features
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV; printed when absent
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Configuration from `--config`, then `FLIGHTFARE_CONFIG`, then the default
/// path if it exists, otherwise built-in defaults
pub fn load_config(flag: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let path = flag
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            default.exists().then_some(default)
        });

    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            Ok(PipelineConfig::from_yaml_file(&path)?)
        }
        None => {
            tracing::info!("no configuration file, using defaults");
            Ok(PipelineConfig::default())
        }
    }
}

fn print_summary(outcome: &PipelineOutcome) {
    section("Training pipeline");
    kv("Run", &outcome.layout.run_id);
    kv("Artifacts", &outcome.layout.run_dir.display().to_string());
    kv(
        "Validation",
        if outcome.validation.validation_status { "passed" } else { "failed" },
    );

    section("Candidates");
    for candidate in &outcome.training.candidates {
        match (candidate.test_r2(), &candidate.error) {
            (Some(r2), _) => println!("  {:<36} {}", muted(&candidate.name), format!("{:.4}", r2).white()),
            (None, Some(e)) => println!("  {:<36} {}", muted(&candidate.name), e.as_str().red()),
            (None, None) => println!("  {:<36} {}", muted(&candidate.name), dim("-")),
        }
    }

    let training = &outcome.training;
    section("Best model");
    kv("Name", &training.best_model_name);
    kv("Train R²", &format!("{:.4}", training.train_metric.r2_score));
    kv("Test R²", &format!("{:.4}", training.test_metric.r2_score));
    kv("Test MAE", &format!("{:.4}", training.test_metric.mae_score));
    kv("Test RMSE", &format!("{:.4}", training.test_metric.rmse_score));
    kv("Bundle", &training.trained_model_file_path.display().to_string());
    if let Some(published) = &outcome.published {
        kv("Published", &published.model_file_path.display().to_string());
    }
    kv("Time", &format!("{:.2}s", outcome.elapsed_secs));
    println!();
}

pub fn cmd_train(config: PipelineConfig) -> anyhow::Result<()> {
    let mut pipeline = TrainingPipeline::from_config(config)?;
    let outcome = pipeline.run_pipeline()?;
    print_summary(&outcome);
    Ok(())
}

pub fn cmd_push(
    config: &PipelineConfig,
    file: &Path,
    database: Option<&str>,
    collection: Option<&str>,
) -> anyhow::Result<()> {
    let database = database.unwrap_or(&config.store.database);
    let collection = collection.unwrap_or(&config.store.collection);
    let store = FileDocumentStore::new(config.store.root.clone());

    let start = Instant::now();
    let inserted = push_csv_file(file, &store, database, collection)?;
    step_ok(&format!(
        "pushed {} records to {}.{} in {:?}",
        inserted,
        database,
        collection,
        start.elapsed()
    ));
    Ok(())
}

pub fn cmd_predict(model_path: &Path, data_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let model = FareModel::load(model_path)?;
    let mut df = read_csv(data_path)?;

    let start = Instant::now();
    let predictions = model.predict(&df)?;
    df.with_column(Column::new("prediction".into(), predictions.to_vec()))?;

    match output {
        Some(path) => {
            write_csv(&df, path)?;
            step_ok(&format!(
                "wrote {} predictions to {} in {:?}",
                df.height(),
                path.display(),
                start.elapsed()
            ));
        }
        None => println!("{}", df),
    }
    Ok(())
}
