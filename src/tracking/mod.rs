//! Experiment tracking
//!
//! Training reports the selected model, its metrics and artifacts to a
//! [`TrackingSink`]. Sinks are optional and their failures never fail a run.

use crate::error::{FlightError, Result};
use crate::training::RegressionMetrics;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// Status of a tracked run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Finished,
    Failed,
}

/// What one training run reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub start_time: DateTime<Utc>,
    pub status: RunStatus,
    pub tags: IndexMap<String, String>,
    pub params: IndexMap<String, String>,
    pub metrics: IndexMap<String, f64>,
    /// Files to attach to the run
    pub artifacts: Vec<PathBuf>,
}

impl RunRecord {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            start_time: Utc::now(),
            status: RunStatus::Finished,
            tags: IndexMap::new(),
            params: IndexMap::new(),
            metrics: IndexMap::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_tag(mut self, key: &str, value: impl Into<String>) -> Self {
        self.tags.insert(key.to_string(), value.into());
        self
    }

    pub fn with_param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    /// Non-finite values are not recorded
    pub fn with_metric(mut self, key: &str, value: f64) -> Self {
        if value.is_finite() {
            self.metrics.insert(key.to_string(), value);
        } else {
            warn!(metric = key, value, "dropping non-finite metric");
        }
        self
    }

    /// Record all four metrics of one partition as `<prefix>_<metric>`
    pub fn with_regression_metrics(self, prefix: &str, metrics: &RegressionMetrics) -> Self {
        self.with_metric(&format!("{}_r2_score", prefix), metrics.r2_score)
            .with_metric(&format!("{}_mae_score", prefix), metrics.mae_score)
            .with_metric(&format!("{}_mse_score", prefix), metrics.mse_score)
            .with_metric(&format!("{}_rmse_score", prefix), metrics.rmse_score)
    }

    pub fn with_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifacts.push(path.into());
        self
    }
}

impl Default for RunRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for experiment tracking backends
pub trait TrackingSink: Send + Sync {
    /// Persist one run
    fn log_run(&self, record: &RunRecord) -> Result<()>;
}

/// Tracks runs on the local filesystem as
/// `<dir>/<experiment>/<run_id>/run.json`, with artifacts copied under
/// `artifacts/` next to it.
#[derive(Debug, Clone)]
pub struct LocalTracker {
    base_dir: PathBuf,
    experiment_name: String,
}

impl LocalTracker {
    pub fn new(base_dir: impl Into<PathBuf>, experiment_name: &str) -> Self {
        Self {
            base_dir: base_dir.into(),
            experiment_name: experiment_name.to_string(),
        }
    }

    /// Directory holding one run
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.base_dir.join(&self.experiment_name).join(run_id)
    }

    /// Load a run written by [`TrackingSink::log_run`]
    pub fn load_run(&self, run_id: &str) -> Result<RunRecord> {
        let path = self.run_dir(run_id).join("run.json");
        let file = File::open(&path).map_err(|e| tracking_io(&path, e))?;
        Ok(serde_json::from_reader(file)?)
    }
}

fn tracking_io(path: &Path, e: std::io::Error) -> FlightError {
    FlightError::TrackingError(format!("{}: {}", path.display(), e))
}

impl TrackingSink for LocalTracker {
    fn log_run(&self, record: &RunRecord) -> Result<()> {
        let run_dir = self.run_dir(&record.run_id);
        let artifact_dir = run_dir.join("artifacts");
        fs::create_dir_all(&artifact_dir).map_err(|e| tracking_io(&artifact_dir, e))?;

        for artifact in &record.artifacts {
            let name = artifact.file_name().ok_or_else(|| {
                FlightError::TrackingError(format!(
                    "artifact {} has no file name",
                    artifact.display()
                ))
            })?;
            fs::copy(artifact, artifact_dir.join(name)).map_err(|e| tracking_io(artifact, e))?;
        }

        let path = run_dir.join("run.json");
        let file = File::create(&path).map_err(|e| tracking_io(&path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), record)?;

        info!(
            experiment = %self.experiment_name,
            run_id = %record.run_id,
            metrics = record.metrics.len(),
            artifacts = record.artifacts.len(),
            "logged run"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_and_load_run() {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("model.bin");
        fs::write(&artifact, b"weights").unwrap();

        let metrics = RegressionMetrics {
            r2_score: 0.9,
            mae_score: 1.0,
            mse_score: 4.0,
            rmse_score: 2.0,
        };
        let record = RunRecord::new()
            .with_tag("best_model", "RandomForestRegressor")
            .with_param("cv_folds", 3)
            .with_regression_metrics("test", &metrics)
            .with_artifact(&artifact);

        let tracker = LocalTracker::new(dir.path().join("mlruns"), "flights");
        tracker.log_run(&record).unwrap();

        let run_dir = tracker.run_dir(&record.run_id);
        assert!(run_dir.join("run.json").exists());
        assert_eq!(fs::read(run_dir.join("artifacts").join("model.bin")).unwrap(), b"weights");

        let loaded = tracker.load_run(&record.run_id).unwrap();
        assert_eq!(loaded, record);
        assert_eq!(
            loaded.metrics.keys().collect::<Vec<_>>(),
            vec!["test_r2_score", "test_mae_score", "test_mse_score", "test_rmse_score"]
        );
    }

    #[test]
    fn test_non_finite_metrics_keep_run_loadable() {
        let dir = TempDir::new().unwrap();
        let metrics = RegressionMetrics {
            r2_score: f64::NAN,
            mae_score: 0.5,
            mse_score: f64::INFINITY,
            rmse_score: 0.7,
        };
        let record = RunRecord::new().with_regression_metrics("test", &metrics);
        assert_eq!(
            record.metrics.keys().collect::<Vec<_>>(),
            vec!["test_mae_score", "test_rmse_score"]
        );

        let tracker = LocalTracker::new(dir.path(), "flights");
        tracker.log_run(&record).unwrap();
        assert_eq!(tracker.load_run(&record.run_id).unwrap(), record);
    }

    #[test]
    fn test_failed_status_roundtrip() {
        let dir = TempDir::new().unwrap();
        let tracker = LocalTracker::new(dir.path(), "flights");
        let record = RunRecord::new()
            .with_status(RunStatus::Failed)
            .with_tag("error", "no candidate succeeded");
        tracker.log_run(&record).unwrap();

        let raw = fs::read_to_string(tracker.run_dir(&record.run_id).join("run.json")).unwrap();
        assert!(raw.contains("\"failed\""));
        assert_eq!(tracker.load_run(&record.run_id).unwrap().status, RunStatus::Failed);
    }

    #[test]
    fn test_missing_artifact_is_tracking_error() {
        let dir = TempDir::new().unwrap();
        let tracker = LocalTracker::new(dir.path(), "flights");
        let record = RunRecord::new().with_artifact(dir.path().join("absent.bin"));

        assert!(matches!(
            tracker.log_run(&record),
            Err(FlightError::TrackingError(_))
        ));
    }
}
