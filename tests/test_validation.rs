//! Integration tests for the data validation stage

use flightfare::config::PipelineConfig;
use flightfare::drift::DriftReport;
use flightfare::error::{FlightError, Stage};
use flightfare::stages::{DataValidation, IngestionArtifact};
use flightfare::utils::{read_yaml_file, write_csv};
use polars::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SCHEMA: &str = "columns:
  - airline: object
  - stops: int64
  - duration: float64
  - price: float64
numerical_columns:
  - stops
  - duration
  - price
";

fn create_table(n: usize, duration_shift: f64) -> DataFrame {
    let airline: Vec<&str> = (0..n).map(|i| ["IndiGo", "Vistara"][i % 2]).collect();
    let stops: Vec<i64> = (0..n).map(|i| (i % 3) as i64).collect();
    let duration: Vec<f64> = (0..n).map(|i| i as f64 * 0.1 + duration_shift).collect();
    let price: Vec<f64> = (0..n).map(|i| 5000.0 + (i % 17) as f64 * 100.0).collect();

    df!(
        "airline" => &airline,
        "stops" => &stops,
        "duration" => &duration,
        "price" => &price
    )
    .unwrap()
}

fn setup(dir: &Path, train: &DataFrame, test: &DataFrame) -> (PipelineConfig, IngestionArtifact) {
    let schema = dir.join("schema.yaml");
    fs::write(&schema, SCHEMA).unwrap();

    let artifact = IngestionArtifact {
        train_file_path: dir.join("train.csv"),
        test_file_path: dir.join("test.csv"),
    };
    write_csv(train, &artifact.train_file_path).unwrap();
    write_csv(test, &artifact.test_file_path).unwrap();

    let config = PipelineConfig::new()
        .with_artifact_root(dir.join("Artifacts"))
        .with_run_id("validate")
        .with_schema_file(schema);
    (config, artifact)
}

#[test]
fn test_matching_tables_pass_with_drift_report() {
    let dir = TempDir::new().unwrap();
    let (config, ingestion) = setup(dir.path(), &create_table(200, 0.0), &create_table(200, 0.0));
    let layout = config.layout();

    let artifact = DataValidation::new(&config, &layout, &ingestion)
        .unwrap()
        .initiate_data_validation()
        .unwrap();

    assert!(artifact.validation_status);
    assert_eq!(artifact.valid_train_file_path, Some(layout.valid_train_file_path.clone()));
    assert_eq!(artifact.valid_test_file_path, Some(layout.valid_test_file_path.clone()));
    assert!(artifact.invalid_train_file_path.is_none());
    assert!(artifact.invalid_test_file_path.is_none());

    let report: DriftReport =
        read_yaml_file(artifact.drift_report_file_path.as_ref().unwrap()).unwrap();
    // Numeric columns only, identical samples never drift
    assert_eq!(report.len(), 3);
    assert!(report.get("airline").is_none());
    assert!(!report.any_drift());
    assert_eq!(report.get("duration").unwrap().p_value, Some(1.0));
}

#[test]
fn test_shifted_column_is_flagged() {
    let dir = TempDir::new().unwrap();
    let (config, ingestion) = setup(dir.path(), &create_table(200, 0.0), &create_table(200, 50.0));
    let layout = config.layout();

    let artifact = DataValidation::new(&config, &layout, &ingestion)
        .unwrap()
        .initiate_data_validation()
        .unwrap();

    // Drift does not affect the status
    assert!(artifact.validation_status);
    let report: DriftReport = read_yaml_file(&layout.drift_report_file_path).unwrap();
    assert_eq!(report.drifted_columns(), vec!["duration"]);
    assert!(report.get("duration").unwrap().p_value.unwrap() < 0.05);
}

#[test]
fn test_column_count_mismatch_routes_to_invalid() {
    let dir = TempDir::new().unwrap();
    let train = create_table(50, 0.0);
    let test = create_table(20, 0.0).drop("stops").unwrap();
    let (config, ingestion) = setup(dir.path(), &train, &test);
    let layout = config.layout();

    let artifact = DataValidation::new(&config, &layout, &ingestion)
        .unwrap()
        .initiate_data_validation()
        .unwrap();

    assert!(!artifact.validation_status);
    assert!(artifact.valid_train_file_path.is_some());
    assert!(artifact.valid_test_file_path.is_none());
    assert_eq!(artifact.invalid_test_file_path, Some(layout.invalid_test_file_path.clone()));
    assert!(layout.invalid_test_file_path.exists());
    assert!(artifact.drift_report_file_path.is_none());
    assert!(!layout.drift_report_file_path.exists());
}

#[test]
fn test_missing_schema_fails_validation_stage() {
    let dir = TempDir::new().unwrap();
    let (config, ingestion) = setup(dir.path(), &create_table(10, 0.0), &create_table(10, 0.0));
    let config = config.with_schema_file(dir.path().join("absent.yaml"));
    let layout = config.layout();

    let err = DataValidation::new(&config, &layout, &ingestion).err().unwrap();
    assert_eq!(err.stage, Stage::Validation);
    assert!(matches!(err.kind(), FlightError::SchemaError(_)));
}
