//! flightfare - Flight-fare regression training pipeline
//!
//! This crate provides a linear batch pipeline that:
//! - Pulls flight records from a document store
//! - Validates the schema and detects train/test drift
//! - Encodes and scales features
//! - Trains a menu of regressors and selects the best by test R²
//! - Persists and publishes the winning model
//!
//! # Modules
//!
//! ## Pipeline
//! - [`pipeline`] - Orchestrator running the stages in order
//! - [`stages`] - Ingestion, validation, transformation, training, publish
//! - [`config`] - Run configuration and artifact layout
//!
//! ## Core ML Modules
//! - [`preprocessing`] - One-hot encoding and standard scaling
//! - [`training`] - Regression estimators, cross-validation, grid search
//! - [`inference`] - Preprocessor + estimator bundle
//! - [`drift`] - Kolmogorov-Smirnov drift detection
//!
//! ## Infrastructure
//! - [`store`] - Document store backends and CSV loader
//! - [`schema`] - Expected table schema
//! - [`tracking`] - Experiment tracking
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Pipeline
pub mod config;
pub mod pipeline;
pub mod stages;

// Core ML modules
pub mod drift;
pub mod inference;
pub mod preprocessing;
pub mod training;

// Infrastructure
pub mod schema;
pub mod store;
pub mod tracking;
pub mod utils;

// Services
pub mod cli;

pub use error::{FlightError, PipelineError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{FlightError, PipelineError, Result, Stage, StageResult};

    // Pipeline
    pub use crate::config::{ArtifactLayout, PipelineConfig};
    pub use crate::pipeline::{PipelineOutcome, PipelineState, TrainingPipeline};
    pub use crate::stages::{
        DataIngestion, DataTransformation, DataValidation, IngestionArtifact, ModelPublisher,
        ModelTrainer, TrainingArtifact, TransformationArtifact, ValidationArtifact,
    };

    // Preprocessing
    pub use crate::preprocessing::{FeaturePreprocessor, OneHotEncoder, StandardScaler};

    // Training
    pub use crate::training::{
        Candidate, Estimator, EstimatorSpec, GridSearch, ParamGrid, RegressionMetrics, Regressor,
    };

    // Inference
    pub use crate::inference::FareModel;

    // Drift detection
    pub use crate::drift::{DriftDetector, DriftReport, KolmogorovSmirnovTest};

    // Storage
    pub use crate::schema::Schema;
    pub use crate::store::{DocumentStore, FileDocumentStore, MemoryDocumentStore};

    // Experiment tracking
    pub use crate::tracking::{LocalTracker, RunRecord, TrackingSink};
}
