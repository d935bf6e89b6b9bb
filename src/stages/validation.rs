//! Data validation: schema column count and train/test drift

use super::artifacts::{IngestionArtifact, ValidationArtifact};
use crate::config::{ArtifactLayout, PipelineConfig};
use crate::drift::{detect_dataset_drift, DriftDetector, DriftReport, KolmogorovSmirnovTest};
use crate::error::{Result, Stage, StageContext, StageResult};
use crate::schema::Schema;
use crate::utils::{column_names, read_csv, write_csv, write_yaml_file};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub struct DataValidation<'a> {
    layout: &'a ArtifactLayout,
    ingestion_artifact: &'a IngestionArtifact,
    schema: Schema,
    detector: Box<dyn DriftDetector>,
}

impl<'a> DataValidation<'a> {
    /// Load the schema document once for this run
    pub fn new(
        config: &'a PipelineConfig,
        layout: &'a ArtifactLayout,
        ingestion_artifact: &'a IngestionArtifact,
    ) -> StageResult<Self> {
        let schema = Schema::from_yaml_file(&config.validation.schema_file_path)
            .stage_context(Stage::Validation, "loading schema")?;
        Ok(Self {
            layout,
            ingestion_artifact,
            schema,
            detector: Box::new(KolmogorovSmirnovTest::new(config.validation.drift_threshold)),
        })
    }

    /// Builder method to replace the drift detector
    pub fn with_detector(mut self, detector: Box<dyn DriftDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// True iff the table has exactly as many columns as the schema.
    ///
    /// Column names are not compared; missing names are only logged.
    pub fn validate_number_of_columns(&self, df: &DataFrame) -> bool {
        let required = self.schema.column_count();
        info!(required, actual = df.width(), "checking number of columns");

        let missing = self.schema.missing_columns(&column_names(df));
        if !missing.is_empty() {
            warn!(?missing, "schema columns missing from table");
        }
        df.width() == required
    }

    /// Test every numeric column of `base` against `current` and write the
    /// report
    pub fn detect_dataset_drift(
        &self,
        base: &DataFrame,
        current: &DataFrame,
    ) -> Result<DriftReport> {
        let report = detect_dataset_drift(base, current, self.detector.as_ref());

        for (column, outcome) in report.iter() {
            if outcome.drift_status {
                info!(column = %column, p_value = ?outcome.p_value, "drift detected");
            }
        }
        info!(
            columns = report.len(),
            drifted = report.drifted_columns().len(),
            threshold = self.detector.threshold(),
            "drift detection complete"
        );

        write_yaml_file(&self.layout.drift_report_file_path, &report)?;
        Ok(report)
    }

    /// Write `df` to the valid or invalid path and return whichever was used
    fn route(
        &self,
        df: &DataFrame,
        name: &str,
        valid_path: &Path,
        invalid_path: &Path,
    ) -> Result<(Option<PathBuf>, Option<PathBuf>)> {
        if self.validate_number_of_columns(df) {
            write_csv(df, valid_path)?;
            Ok((Some(valid_path.to_path_buf()), None))
        } else {
            error!(table = name, "column count does not match schema");
            write_csv(df, invalid_path)?;
            Ok((None, Some(invalid_path.to_path_buf())))
        }
    }

    pub fn initiate_data_validation(&self) -> StageResult<ValidationArtifact> {
        info!("reading training and testing data");
        let train_df = read_csv(&self.ingestion_artifact.train_file_path)
            .stage_context(Stage::Validation, "reading training data")?;
        let test_df = read_csv(&self.ingestion_artifact.test_file_path)
            .stage_context(Stage::Validation, "reading testing data")?;

        let (valid_train, invalid_train) = self
            .route(
                &train_df,
                "train",
                &self.layout.valid_train_file_path,
                &self.layout.invalid_train_file_path,
            )
            .stage_context(Stage::Validation, "writing training data")?;
        let (valid_test, invalid_test) = self
            .route(
                &test_df,
                "test",
                &self.layout.valid_test_file_path,
                &self.layout.invalid_test_file_path,
            )
            .stage_context(Stage::Validation, "writing testing data")?;

        let validation_status = valid_train.is_some() && valid_test.is_some();
        let drift_report_file_path = if validation_status {
            self.detect_dataset_drift(&train_df, &test_df)
                .stage_context(Stage::Validation, "detecting dataset drift")?;
            Some(self.layout.drift_report_file_path.clone())
        } else {
            None
        };

        let artifact = ValidationArtifact {
            validation_status,
            valid_train_file_path: valid_train,
            valid_test_file_path: valid_test,
            invalid_train_file_path: invalid_train,
            invalid_test_file_path: invalid_test,
            drift_report_file_path,
        };
        info!(?artifact, "data validation complete");
        Ok(artifact)
    }
}
