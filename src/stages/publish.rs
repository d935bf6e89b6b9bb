//! Publishing the winning preprocessor and estimator to a fixed location

use super::artifacts::{PublishedModel, TrainingArtifact, TransformationArtifact};
use crate::error::{Stage, StageContext, StageResult};
use crate::utils::copy_file;
use std::path::{Path, PathBuf};
use tracing::info;

pub const PUBLISHED_PREPROCESSOR_FILE: &str = "preprocessor.bin";
pub const PUBLISHED_MODEL_FILE: &str = "model.bin";

/// Copies a run's preprocessor and best estimator into `publish_dir`,
/// replacing whatever was published before
#[derive(Debug, Clone)]
pub struct ModelPublisher {
    publish_dir: PathBuf,
}

impl ModelPublisher {
    pub fn new(publish_dir: impl Into<PathBuf>) -> Self {
        Self {
            publish_dir: publish_dir.into(),
        }
    }

    pub fn publish_dir(&self) -> &Path {
        &self.publish_dir
    }

    pub fn publish(
        &self,
        transformation: &TransformationArtifact,
        training: &TrainingArtifact,
    ) -> StageResult<PublishedModel> {
        let published = PublishedModel {
            preprocessor_file_path: self.publish_dir.join(PUBLISHED_PREPROCESSOR_FILE),
            model_file_path: self.publish_dir.join(PUBLISHED_MODEL_FILE),
        };

        copy_file(
            &transformation.transformed_object_file_path,
            &published.preprocessor_file_path,
        )
        .stage_context(Stage::Publish, "publishing preprocessor")?;
        copy_file(&training.best_estimator_file_path, &published.model_file_path)
            .stage_context(Stage::Publish, "publishing model")?;

        info!(
            model = %training.best_model_name,
            dir = %self.publish_dir.display(),
            "published model"
        );
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlightError;
    use crate::training::RegressionMetrics;
    use std::fs;
    use tempfile::TempDir;

    fn artifacts(dir: &Path) -> (TransformationArtifact, TrainingArtifact) {
        let metrics = RegressionMetrics {
            r2_score: 1.0,
            mae_score: 0.0,
            mse_score: 0.0,
            rmse_score: 0.0,
        };
        (
            TransformationArtifact {
                transformed_object_file_path: dir.join("preprocessing.bin"),
                transformed_train_file_path: dir.join("train.bin"),
                transformed_test_file_path: dir.join("test.bin"),
            },
            TrainingArtifact {
                best_model_name: "Ridge".to_string(),
                trained_model_file_path: dir.join("model.bin"),
                best_estimator_file_path: dir.join("estimator.bin"),
                train_metric: metrics,
                test_metric: metrics,
                candidates: Vec::new(),
                feature_importances: None,
            },
        )
    }

    #[test]
    fn test_publish_copies_both_files() {
        let dir = TempDir::new().unwrap();
        let (transformation, training) = artifacts(dir.path());
        fs::write(&transformation.transformed_object_file_path, b"pre").unwrap();
        fs::write(&training.best_estimator_file_path, b"est").unwrap();

        let publisher = ModelPublisher::new(dir.path().join("final_model"));
        let published = publisher.publish(&transformation, &training).unwrap();

        assert_eq!(fs::read(&published.preprocessor_file_path).unwrap(), b"pre");
        assert_eq!(fs::read(&published.model_file_path).unwrap(), b"est");
        assert!(published.model_file_path.ends_with("final_model/model.bin"));
    }

    #[test]
    fn test_publish_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let (transformation, training) = artifacts(dir.path());

        let err = ModelPublisher::new(dir.path().join("out"))
            .publish(&transformation, &training)
            .unwrap_err();
        assert_eq!(err.stage, Stage::Publish);
        assert!(matches!(err.kind(), FlightError::PathIo { .. }));
    }
}
