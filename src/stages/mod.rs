//! Pipeline stages
//!
//! Each stage consumes the previous stage's artifact and returns its own,
//! wrapping any failure in a [`PipelineError`](crate::error::PipelineError).

pub mod artifacts;
pub mod ingestion;
pub mod publish;
pub mod trainer;
pub mod transformation;
pub mod validation;

pub use artifacts::{
    CandidateReport, IngestionArtifact, PublishedModel, TrainingArtifact, TransformationArtifact,
    ValidationArtifact,
};
pub use ingestion::DataIngestion;
pub use publish::ModelPublisher;
pub use trainer::ModelTrainer;
pub use transformation::DataTransformation;
pub use validation::DataValidation;
