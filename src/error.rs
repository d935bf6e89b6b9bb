//! Error types for the flight-fare training pipeline
//!
//! [`FlightError`] is the typed failure returned by every operation.
//! [`PipelineError`] is the uniform wrapper produced at stage boundaries: it
//! carries the stage, the call site that failed, a human message and the
//! typed cause.

use std::fmt;
use std::panic::Location;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, FlightError>;

/// Result type alias for stage entry points
pub type StageResult<T> = std::result::Result<T, PipelineError>;

/// Typed error kinds
#[derive(Error, Debug)]
pub enum FlightError {
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Tracking error: {0}")]
    TrackingError(String),

    #[error("IO error on {path}: {source}")]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl FlightError {
    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FlightError::PathIo {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying the failed operation could succeed.
    ///
    /// Only store connectivity failures are considered transient; the
    /// pipeline itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FlightError::Connectivity(_))
    }
}

impl From<polars::error::PolarsError> for FlightError {
    fn from(err: polars::error::PolarsError) -> Self {
        FlightError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for FlightError {
    fn from(err: serde_json::Error) -> Self {
        FlightError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for FlightError {
    fn from(err: serde_yaml::Error) -> Self {
        FlightError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for FlightError {
    fn from(err: bincode::Error) -> Self {
        FlightError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for FlightError {
    fn from(err: ndarray::ShapeError) -> Self {
        FlightError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

/// Pipeline stage that produced a [`PipelineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configuration,
    Ingestion,
    Validation,
    Transformation,
    Training,
    Publish,
    Loader,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configuration => "configuration",
            Stage::Ingestion => "data ingestion",
            Stage::Validation => "data validation",
            Stage::Transformation => "data transformation",
            Stage::Training => "model training",
            Stage::Publish => "model publish",
            Stage::Loader => "data loader",
        };
        f.write_str(name)
    }
}

/// Failure wrapped at a stage boundary
#[derive(Error, Debug)]
#[error("{stage} failed at {location}: {message}")]
pub struct PipelineError {
    pub stage: Stage,
    pub message: String,
    pub location: &'static Location<'static>,
    #[source]
    pub source: FlightError,
}

impl PipelineError {
    /// Wrap `source`, recording the caller as the failing location
    #[track_caller]
    pub fn new(stage: Stage, message: impl Into<String>, source: FlightError) -> Self {
        Self {
            stage,
            message: message.into(),
            location: Location::caller(),
            source,
        }
    }

    /// The typed cause
    pub fn kind(&self) -> &FlightError {
        &self.source
    }
}

/// Re-wrap a typed result at a stage boundary
pub trait StageContext<T> {
    fn stage_context(self, stage: Stage, message: impl Into<String>) -> StageResult<T>;
}

impl<T, E: Into<FlightError>> StageContext<T> for std::result::Result<T, E> {
    #[track_caller]
    fn stage_context(self, stage: Stage, message: impl Into<String>) -> StageResult<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(PipelineError::new(stage, message, err.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlightError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FlightError = io_err.into();
        assert!(matches!(err, FlightError::IoError(_)));
    }

    #[test]
    fn test_only_connectivity_is_retryable() {
        assert!(FlightError::Connectivity("down".into()).is_retryable());
        assert!(!FlightError::SchemaError("bad".into()).is_retryable());
        assert!(!FlightError::ModelNotFitted.is_retryable());
    }

    #[test]
    fn test_stage_context_records_location() {
        let result: Result<()> = Err(FlightError::ValidationError("bad".into()));
        let line = line!() + 1;
        let err = result.stage_context(Stage::Validation, "checking tables").unwrap_err();

        assert_eq!(err.stage, Stage::Validation);
        assert_eq!(err.location.line(), line);
        assert!(err.location.file().ends_with("error.rs"));
        assert!(matches!(err.kind(), FlightError::ValidationError(_)));

        let text = err.to_string();
        assert!(text.starts_with("data validation failed at"));
        assert!(text.ends_with("checking tables"));
    }
}
