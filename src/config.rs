//! Pipeline configuration and per-run artifact layout

use crate::error::{FlightError, Result};
use crate::training::{default_menu, Candidate};
use crate::utils::read_yaml_file;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Format of run directory names
pub const RUN_ID_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

/// Where source documents live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory of the file-backed document store
    pub root: PathBuf,
    pub database: String,
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data_store"),
            database: "FlightDB".to_string(),
            collection: "FlightData".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Fraction of rows held out for testing
    pub train_test_split_ratio: f64,
    /// Seed for the shuffle; entropy when absent
    pub random_seed: Option<u64>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            train_test_split_ratio: 0.2,
            random_seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// YAML schema document
    pub schema_file_path: PathBuf,
    /// KS p-value at or below which a column counts as drifted
    pub drift_threshold: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            schema_file_path: PathBuf::from("data_schema/schema.yaml"),
            drift_threshold: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformationConfig {
    pub target_column: String,
}

impl Default for TransformationConfig {
    fn default() -> Self {
        Self {
            target_column: "price".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Estimators to try, in selection order
    pub menu: Vec<Candidate>,
    /// Folds used by grid search
    pub cv_folds: usize,
    /// Seed for stochastic estimators; entropy when absent
    pub random_seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            menu: default_menu(),
            cv_folds: 3,
            random_seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub enabled: bool,
    /// Root of the local tracking store
    pub tracking_dir: PathBuf,
    pub experiment_name: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tracking_dir: PathBuf::from("mlruns"),
            experiment_name: "flightfare".to_string(),
        }
    }
}

/// Configuration for a full training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Parent of the per-run artifact directories
    pub artifact_root: PathBuf,
    /// Run directory name; a timestamp when absent
    pub run_id: Option<String>,
    /// Where the winning preprocessor and model are published; disabled when absent
    pub publish_dir: Option<PathBuf>,
    pub store: StoreConfig,
    pub ingestion: IngestionConfig,
    pub validation: ValidationConfig,
    pub transformation: TransformationConfig,
    pub training: TrainingConfig,
    pub tracking: TrackingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            artifact_root: PathBuf::from("Artifacts"),
            run_id: None,
            publish_dir: Some(PathBuf::from("final_model")),
            store: StoreConfig::default(),
            ingestion: IngestionConfig::default(),
            validation: ValidationConfig::default(),
            transformation: TransformationConfig::default(),
            training: TrainingConfig::default(),
            tracking: TrackingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a YAML configuration file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let config: Self = read_yaml_file(path)
            .map_err(|e| FlightError::ConfigError(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method to set the artifact root
    pub fn with_artifact_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.artifact_root = root.into();
        self
    }

    /// Builder method to pin the run directory name
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Builder method to set or disable the publish directory
    pub fn with_publish_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.publish_dir = dir;
        self
    }

    pub fn with_store(mut self, root: impl Into<PathBuf>, database: &str, collection: &str) -> Self {
        self.store = StoreConfig {
            root: root.into(),
            database: database.to_string(),
            collection: collection.to_string(),
        };
        self
    }

    pub fn with_split_ratio(mut self, ratio: f64) -> Self {
        self.ingestion.train_test_split_ratio = ratio;
        self
    }

    pub fn with_schema_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.validation.schema_file_path = path.into();
        self
    }

    pub fn with_drift_threshold(mut self, threshold: f64) -> Self {
        self.validation.drift_threshold = threshold;
        self
    }

    pub fn with_target_column(mut self, column: &str) -> Self {
        self.transformation.target_column = column.to_string();
        self
    }

    pub fn with_menu(mut self, menu: Vec<Candidate>) -> Self {
        self.training.menu = menu;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.training.cv_folds = folds;
        self
    }

    /// Builder method to seed both the split and the estimators
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.ingestion.random_seed = Some(seed);
        self.training.random_seed = Some(seed);
        self
    }

    /// Builder method to enable local experiment tracking
    pub fn with_tracking(mut self, dir: impl Into<PathBuf>, experiment: &str) -> Self {
        self.tracking = TrackingConfig {
            enabled: true,
            tracking_dir: dir.into(),
            experiment_name: experiment.to_string(),
        };
        self
    }

    /// Reject out-of-range values
    pub fn validate(&self) -> Result<()> {
        let ratio = self.ingestion.train_test_split_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(FlightError::ConfigError(format!(
                "train_test_split_ratio must be in (0, 1), got {}",
                ratio
            )));
        }
        let threshold = self.validation.drift_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(FlightError::ConfigError(format!(
                "drift_threshold must be in (0, 1), got {}",
                threshold
            )));
        }
        if self.transformation.target_column.is_empty() {
            return Err(FlightError::ConfigError(
                "target_column must not be empty".to_string(),
            ));
        }
        if self.training.cv_folds < 2 {
            return Err(FlightError::ConfigError(format!(
                "cv_folds must be at least 2, got {}",
                self.training.cv_folds
            )));
        }
        if self.training.menu.is_empty() {
            return Err(FlightError::ConfigError(
                "training menu must not be empty".to_string(),
            ));
        }
        if self.store.database.is_empty() || self.store.collection.is_empty() {
            return Err(FlightError::ConfigError(
                "store database and collection must be set".to_string(),
            ));
        }
        if let Some(run_id) = &self.run_id {
            if run_id.is_empty() || run_id.contains(|c: char| c == '/' || c == '\\') {
                return Err(FlightError::ConfigError(format!(
                    "run_id must be a plain directory name, got {:?}",
                    run_id
                )));
            }
        }
        Ok(())
    }

    /// Resolve the artifact paths of one run
    pub fn layout(&self) -> ArtifactLayout {
        let run_id = self
            .run_id
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format(RUN_ID_FORMAT).to_string());
        ArtifactLayout::new(self.artifact_root.join(&run_id), run_id)
    }
}

/// Every file a run reads or writes, under one run directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactLayout {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub feature_store_file_path: PathBuf,
    pub ingested_train_file_path: PathBuf,
    pub ingested_test_file_path: PathBuf,
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
    pub invalid_train_file_path: PathBuf,
    pub invalid_test_file_path: PathBuf,
    pub drift_report_file_path: PathBuf,
    pub transformed_train_file_path: PathBuf,
    pub transformed_test_file_path: PathBuf,
    pub transformed_object_file_path: PathBuf,
    pub trained_model_file_path: PathBuf,
    pub best_estimator_file_path: PathBuf,
}

impl ArtifactLayout {
    pub fn new(run_dir: PathBuf, run_id: String) -> Self {
        let ingestion = run_dir.join("data_ingestion");
        let validation = run_dir.join("data_validation");
        let transformation = run_dir.join("data_transformation");
        let trained = run_dir.join("model_trainer").join("trained_model");

        Self {
            feature_store_file_path: ingestion.join("feature_store").join("flight_data.csv"),
            ingested_train_file_path: ingestion.join("ingested").join("train.csv"),
            ingested_test_file_path: ingestion.join("ingested").join("test.csv"),
            valid_train_file_path: validation.join("validated").join("train.csv"),
            valid_test_file_path: validation.join("validated").join("test.csv"),
            invalid_train_file_path: validation.join("invalid").join("train.csv"),
            invalid_test_file_path: validation.join("invalid").join("test.csv"),
            drift_report_file_path: validation.join("drift_report").join("report.yaml"),
            transformed_train_file_path: transformation.join("transformed").join("train.bin"),
            transformed_test_file_path: transformation.join("transformed").join("test.bin"),
            transformed_object_file_path: transformation
                .join("transformed_object")
                .join("preprocessing.bin"),
            trained_model_file_path: trained.join("model.bin"),
            best_estimator_file_path: trained.join("estimator.bin"),
            run_id,
            run_dir,
        }
    }
}
