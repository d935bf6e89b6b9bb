//! Data transformation: validated CSV tables to dense training arrays

use super::artifacts::{TransformationArtifact, ValidationArtifact};
use crate::config::{ArtifactLayout, PipelineConfig};
use crate::error::{FlightError, Result, Stage, StageContext, StageResult};
use crate::preprocessing::FeaturePreprocessor;
use crate::utils::{column_as_f64, read_csv, save_object};
use ndarray::{concatenate, Array1, Array2, Axis};
use polars::prelude::DataFrame;
use tracing::info;

/// Split a table into its feature columns and the numeric target
pub fn split_features_target(df: &DataFrame, target: &str) -> Result<(DataFrame, Array1<f64>)> {
    if df.column(target).is_err() {
        return Err(FlightError::FeatureNotFound(target.to_string()));
    }
    let values = column_as_f64(df, target)?;
    let nulls = values.iter().filter(|v| v.is_none()).count();
    if nulls > 0 {
        return Err(FlightError::DataError(format!(
            "target column {} has {} null or non-numeric values",
            target, nulls
        )));
    }
    let y = Array1::from_iter(values.into_iter().flatten());
    let features = df.drop(target)?;
    Ok((features, y))
}

/// Append the target as the last column
pub fn with_target(x: &Array2<f64>, y: &Array1<f64>) -> Result<Array2<f64>> {
    Ok(concatenate(
        Axis(1),
        &[x.view(), y.view().insert_axis(Axis(1))],
    )?)
}

pub struct DataTransformation<'a> {
    config: &'a PipelineConfig,
    layout: &'a ArtifactLayout,
    validation_artifact: &'a ValidationArtifact,
}

impl<'a> DataTransformation<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        layout: &'a ArtifactLayout,
        validation_artifact: &'a ValidationArtifact,
    ) -> Self {
        Self {
            config,
            layout,
            validation_artifact,
        }
    }

    fn transform(&self) -> Result<TransformationArtifact> {
        let (train_path, test_path) = match (
            &self.validation_artifact.valid_train_file_path,
            &self.validation_artifact.valid_test_file_path,
        ) {
            (Some(train), Some(test)) => (train, test),
            _ => {
                return Err(FlightError::ValidationError(
                    "transformation needs both validated tables".to_string(),
                ))
            }
        };

        let train_df = read_csv(train_path)?;
        let test_df = read_csv(test_path)?;

        let target = &self.config.transformation.target_column;
        let (train_features, train_target) = split_features_target(&train_df, target)?;
        let (test_features, test_target) = split_features_target(&test_df, target)?;

        let mut preprocessor = FeaturePreprocessor::new();
        let train_x = preprocessor.fit_transform(&train_features)?;
        let test_x = preprocessor.transform(&test_features)?;
        info!(
            features = preprocessor.feature_width(),
            train_rows = train_x.nrows(),
            test_rows = test_x.nrows(),
            "fitted preprocessor on training features"
        );

        let train_arr = with_target(&train_x, &train_target)?;
        let test_arr = with_target(&test_x, &test_target)?;

        save_object(&self.layout.transformed_train_file_path, &train_arr)?;
        save_object(&self.layout.transformed_test_file_path, &test_arr)?;
        save_object(&self.layout.transformed_object_file_path, &preprocessor)?;

        Ok(TransformationArtifact {
            transformed_object_file_path: self.layout.transformed_object_file_path.clone(),
            transformed_train_file_path: self.layout.transformed_train_file_path.clone(),
            transformed_test_file_path: self.layout.transformed_test_file_path.clone(),
        })
    }

    pub fn initiate_data_transformation(&self) -> StageResult<TransformationArtifact> {
        info!("starting data transformation");
        let artifact = self
            .transform()
            .stage_context(Stage::Transformation, "transforming validated data")?;
        info!(?artifact, "data transformation complete");
        Ok(artifact)
    }
}
