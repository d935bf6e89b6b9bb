//! Integration tests for the data transformation stage

use flightfare::config::PipelineConfig;
use flightfare::error::{FlightError, Stage};
use flightfare::preprocessing::{ColumnType, FeaturePreprocessor};
use flightfare::stages::{DataTransformation, ValidationArtifact};
use flightfare::utils::{load_object, write_csv};
use ndarray::{s, Array2};
use polars::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn create_train() -> DataFrame {
    df!(
        "airline" => &["IndiGo", "Vistara", "SpiceJet", "IndiGo", "Vistara", "SpiceJet"],
        "class" => &["Economy", "Business", "Economy", "Economy", "Business", "Business"],
        "duration" => &[2.0, 3.5, 1.5, 2.5, 4.0, 3.0],
        "days_left" => &[10i64, 3, 25, 14, 1, 7],
        "price" => &[5200.0, 31000.0, 4100.0, 4900.0, 42000.0, 28000.0]
    )
    .unwrap()
}

fn create_test() -> DataFrame {
    df!(
        "airline" => &["Vistara", "AirAsia"],
        "class" => &["Economy", "Business"],
        "duration" => &[2.25, 3.75],
        "days_left" => &[5i64, 20],
        "price" => &[6100.0, 30500.0]
    )
    .unwrap()
}

fn validated(dir: &Path, train: &DataFrame, test: &DataFrame) -> ValidationArtifact {
    let train_path = dir.join("valid_train.csv");
    let test_path = dir.join("valid_test.csv");
    write_csv(train, &train_path).unwrap();
    write_csv(test, &test_path).unwrap();

    ValidationArtifact {
        validation_status: true,
        valid_train_file_path: Some(train_path),
        valid_test_file_path: Some(test_path),
        invalid_train_file_path: None,
        invalid_test_file_path: None,
        drift_report_file_path: None,
    }
}

fn config_for(dir: &Path) -> PipelineConfig {
    PipelineConfig::new()
        .with_artifact_root(dir.join("Artifacts"))
        .with_run_id("transform")
        .with_target_column("price")
}

#[test]
fn test_transformation_writes_arrays_and_preprocessor() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path());
    let layout = config.layout();
    let validation = validated(dir.path(), &create_train(), &create_test());

    let artifact = DataTransformation::new(&config, &layout, &validation)
        .initiate_data_transformation()
        .unwrap();

    let preprocessor: FeaturePreprocessor =
        load_object(&artifact.transformed_object_file_path).unwrap();
    assert!(preprocessor.is_fitted());
    // airline: 3 categories minus the dropped first, class: 2 minus 1, 2 numeric
    assert_eq!(preprocessor.feature_width(), 2 + 1 + 2);
    assert_eq!(
        preprocessor.input_columns(),
        vec![
            ("airline", ColumnType::Categorical),
            ("class", ColumnType::Categorical),
            ("duration", ColumnType::Numeric),
            ("days_left", ColumnType::Numeric),
        ]
    );

    let train: Array2<f64> = load_object(&artifact.transformed_train_file_path).unwrap();
    let test: Array2<f64> = load_object(&artifact.transformed_test_file_path).unwrap();
    assert_eq!(train.dim(), (6, 6));
    assert_eq!(test.dim(), (2, 6));

    // Target is the last column, untouched
    assert_eq!(test.column(5).to_vec(), vec![6100.0, 30500.0]);

    // Training features are standardized
    let features = train.slice(s![.., ..5]);
    for column in features.columns() {
        let mean = column.mean().unwrap();
        assert!(mean.abs() < 1e-9);
    }

    // Persisted preprocessor reproduces the saved test features
    let recomputed = preprocessor
        .transform(&create_test().drop("price").unwrap())
        .unwrap();
    assert_eq!(recomputed, test.slice(s![.., ..5]).to_owned());
}

#[test]
fn test_missing_validated_table_is_validation_error() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path());
    let layout = config.layout();
    let mut validation = validated(dir.path(), &create_train(), &create_test());
    validation.validation_status = false;
    validation.valid_test_file_path = None;

    let err = DataTransformation::new(&config, &layout, &validation)
        .initiate_data_transformation()
        .unwrap_err();
    assert_eq!(err.stage, Stage::Transformation);
    assert!(matches!(err.kind(), FlightError::ValidationError(_)));
    assert!(!layout.transformed_object_file_path.exists());
}

#[test]
fn test_missing_target_column_is_feature_error() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path()).with_target_column("fare");
    let layout = config.layout();
    let validation = validated(dir.path(), &create_train(), &create_test());

    let err = DataTransformation::new(&config, &layout, &validation)
        .initiate_data_transformation()
        .unwrap_err();
    assert_eq!(err.stage, Stage::Transformation);
    assert!(matches!(err.kind(), FlightError::FeatureNotFound(_)));
}
