//! Training pipeline orchestrator
//!
//! Runs ingestion, validation, transformation and training strictly in order,
//! then publishes the result when a publish directory is configured.

use crate::config::{ArtifactLayout, PipelineConfig};
use crate::error::{FlightError, PipelineError, Stage, StageContext, StageResult};
use crate::stages::{
    DataIngestion, DataTransformation, DataValidation, IngestionArtifact, ModelPublisher,
    ModelTrainer, PublishedModel, TrainingArtifact, TransformationArtifact, ValidationArtifact,
};
use crate::store::{DocumentStore, FileDocumentStore};
use crate::tracking::{LocalTracker, TrackingSink};
use std::fmt;
use std::time::Instant;
use tracing::{info, warn};

/// Position of a run in the stage sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Ingest,
    Validate,
    Transform,
    Train,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Ingest => "ingest",
            PipelineState::Validate => "validate",
            PipelineState::Transform => "transform",
            PipelineState::Train => "train",
            PipelineState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Every artifact of a completed run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub layout: ArtifactLayout,
    pub ingestion: IngestionArtifact,
    pub validation: ValidationArtifact,
    pub transformation: TransformationArtifact,
    pub training: TrainingArtifact,
    pub published: Option<PublishedModel>,
    pub elapsed_secs: f64,
}

pub struct TrainingPipeline {
    config: PipelineConfig,
    layout: ArtifactLayout,
    store: Box<dyn DocumentStore>,
    tracker: Option<Box<dyn TrackingSink>>,
    state: PipelineState,
}

impl TrainingPipeline {
    /// Validate the configuration and fix the run directory
    pub fn new(
        config: PipelineConfig,
        store: Box<dyn DocumentStore>,
        tracker: Option<Box<dyn TrackingSink>>,
    ) -> StageResult<Self> {
        config
            .validate()
            .stage_context(Stage::Configuration, "validating pipeline configuration")?;
        let layout = config.layout();
        Ok(Self {
            config,
            layout,
            store,
            tracker,
            state: PipelineState::Ingest,
        })
    }

    /// Pipeline over the file document store, with local tracking when enabled
    pub fn from_config(config: PipelineConfig) -> StageResult<Self> {
        let store = Box::new(FileDocumentStore::new(config.store.root.clone()));
        let tracker: Option<Box<dyn TrackingSink>> = if config.tracking.enabled {
            Some(Box::new(LocalTracker::new(
                config.tracking.tracking_dir.clone(),
                &config.tracking.experiment_name,
            )))
        } else {
            None
        };
        Self::new(config, store, tracker)
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn advance(&mut self, next: PipelineState) {
        info!(from = %self.state, to = %next, "pipeline state");
        self.state = next;
    }

    pub fn start_data_ingestion(&self) -> StageResult<IngestionArtifact> {
        info!("starting data ingestion");
        DataIngestion::new(&self.config, &self.layout, self.store.as_ref()).initiate_data_ingestion()
    }

    pub fn start_data_validation(
        &self,
        ingestion: &IngestionArtifact,
    ) -> StageResult<ValidationArtifact> {
        info!("starting data validation");
        DataValidation::new(&self.config, &self.layout, ingestion)?.initiate_data_validation()
    }

    pub fn start_data_transformation(
        &self,
        validation: &ValidationArtifact,
    ) -> StageResult<TransformationArtifact> {
        info!("starting data transformation");
        DataTransformation::new(&self.config, &self.layout, validation)
            .initiate_data_transformation()
    }

    pub fn start_model_trainer(
        &self,
        transformation: &TransformationArtifact,
    ) -> StageResult<TrainingArtifact> {
        info!("starting model training");
        ModelTrainer::new(
            &self.config,
            &self.layout,
            transformation,
            self.tracker.as_deref(),
        )
        .initiate_model_trainer()
    }

    /// Run every stage. Stops at the first failure, leaving earlier
    /// artifacts on disk.
    pub fn run_pipeline(&mut self) -> StageResult<PipelineOutcome> {
        let start = Instant::now();
        info!(run_id = %self.layout.run_id, run_dir = %self.layout.run_dir.display(), "starting training pipeline");

        self.state = PipelineState::Ingest;
        let ingestion = self.start_data_ingestion()?;

        self.advance(PipelineState::Validate);
        let validation = self.start_data_validation(&ingestion)?;
        if !validation.validation_status {
            warn!(?validation, "validation failed, halting before transformation");
            return Err(PipelineError::new(
                Stage::Validation,
                "validation status is false, halting before transformation",
                FlightError::ValidationError(
                    "train or test table does not match the schema".to_string(),
                ),
            ));
        }

        self.advance(PipelineState::Transform);
        let transformation = self.start_data_transformation(&validation)?;

        self.advance(PipelineState::Train);
        let training = self.start_model_trainer(&transformation)?;

        let published = match &self.config.publish_dir {
            Some(dir) => Some(ModelPublisher::new(dir.clone()).publish(&transformation, &training)?),
            None => None,
        };

        self.advance(PipelineState::Done);
        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(
            best_model = %training.best_model_name,
            test_r2 = training.test_metric.r2_score,
            elapsed_secs,
            "training pipeline complete"
        );

        Ok(PipelineOutcome {
            layout: self.layout.clone(),
            ingestion,
            validation,
            transformation,
            training,
            published,
            elapsed_secs,
        })
    }
}
