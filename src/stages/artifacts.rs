//! Stage outputs
//!
//! Each stage returns one of these. They are created once and only read by
//! later stages.

use crate::training::RegressionMetrics;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output of data ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionArtifact {
    pub train_file_path: PathBuf,
    pub test_file_path: PathBuf,
}

/// Output of data validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationArtifact {
    /// True iff both tables passed
    pub validation_status: bool,
    pub valid_train_file_path: Option<PathBuf>,
    pub valid_test_file_path: Option<PathBuf>,
    pub invalid_train_file_path: Option<PathBuf>,
    pub invalid_test_file_path: Option<PathBuf>,
    /// Present iff drift detection ran
    pub drift_report_file_path: Option<PathBuf>,
}

/// Output of data transformation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationArtifact {
    pub transformed_object_file_path: PathBuf,
    pub transformed_train_file_path: PathBuf,
    pub transformed_test_file_path: PathBuf,
}

/// How one menu entry fared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub name: String,
    /// Parameters of the fitted model (after any grid search)
    pub params: String,
    /// Mean cross-validated R² when a grid was searched
    pub cv_score: Option<f64>,
    pub train_metric: Option<RegressionMetrics>,
    pub test_metric: Option<RegressionMetrics>,
    /// Why the candidate could not be fit
    pub error: Option<String>,
}

impl CandidateReport {
    /// Test R² used for selection
    pub fn test_r2(&self) -> Option<f64> {
        self.test_metric.map(|m| m.r2_score)
    }
}

/// Output of model training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingArtifact {
    pub best_model_name: String,
    /// Preprocessor and estimator bundle
    pub trained_model_file_path: PathBuf,
    /// Bare estimator, as published
    pub best_estimator_file_path: PathBuf,
    pub train_metric: RegressionMetrics,
    pub test_metric: RegressionMetrics,
    /// Every menu entry in menu order
    pub candidates: Vec<CandidateReport>,
    /// Importance per output feature, when the winner is tree-based
    #[serde(default)]
    pub feature_importances: Option<IndexMap<String, f64>>,
}

/// Output of the publish step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedModel {
    pub preprocessor_file_path: PathBuf,
    pub model_file_path: PathBuf,
}
