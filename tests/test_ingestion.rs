//! Integration tests for the document store and data ingestion stage

use flightfare::config::PipelineConfig;
use flightfare::error::{FlightError, Stage};
use flightfare::stages::DataIngestion;
use flightfare::store::{
    dataframe_to_documents, push_csv_file, DocumentStore, FileDocumentStore, MemoryDocumentStore,
};
use flightfare::utils::{column_as_f64, column_names, read_csv, write_csv};
use polars::prelude::*;
use tempfile::TempDir;

fn create_fares(n: usize) -> DataFrame {
    let airlines: Vec<&str> = (0..n).map(|i| ["IndiGo", "Vistara", "SpiceJet"][i % 3]).collect();
    let stops: Vec<i64> = (0..n).map(|i| (i % 3) as i64).collect();
    let price: Vec<f64> = (0..n).map(|i| 4000.0 + i as f64 * 10.0).collect();

    df!(
        "airline" => &airlines,
        "stops" => &stops,
        "price" => &price
    )
    .unwrap()
}

fn config_for(dir: &TempDir, seed: u64) -> PipelineConfig {
    PipelineConfig::new()
        .with_artifact_root(dir.path().join("Artifacts"))
        .with_run_id("ingest")
        .with_store(dir.path().join("store"), "FlightDB", "FlightData")
        .with_random_seed(seed)
}

#[test]
fn test_ingestion_splits_collection() {
    let dir = TempDir::new().unwrap();
    let store = MemoryDocumentStore::new();
    store
        .insert_many("FlightDB", "FlightData", dataframe_to_documents(&create_fares(50)).unwrap())
        .unwrap();

    let config = config_for(&dir, 7);
    let layout = config.layout();
    let artifact = DataIngestion::new(&config, &layout, &store)
        .initiate_data_ingestion()
        .unwrap();

    let feature_store = read_csv(&layout.feature_store_file_path).unwrap();
    assert_eq!(feature_store.height(), 50);
    // `_id` never reaches the table
    assert_eq!(column_names(&feature_store), vec!["airline", "stops", "price"]);

    let train = read_csv(&artifact.train_file_path).unwrap();
    let test = read_csv(&artifact.test_file_path).unwrap();
    assert_eq!(test.height(), 10);
    assert_eq!(train.height(), 40);

    // Every row lands on exactly one side
    let mut prices: Vec<f64> = column_as_f64(&train, "price")
        .unwrap()
        .into_iter()
        .chain(column_as_f64(&test, "price").unwrap())
        .flatten()
        .collect();
    prices.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let expected: Vec<f64> = (0..50).map(|i| 4000.0 + i as f64 * 10.0).collect();
    assert_eq!(prices, expected);
}

#[test]
fn test_seeded_split_is_deterministic() {
    let df = create_fares(30);
    let dir = TempDir::new().unwrap();
    let store = MemoryDocumentStore::new();
    let config = config_for(&dir, 99);
    let layout = config.layout();
    let ingestion = DataIngestion::new(&config, &layout, &store);

    let (_, first) = ingestion.split_data_as_train_test(&df).unwrap();
    let (_, second) = ingestion.split_data_as_train_test(&df).unwrap();
    assert!(first.equals(&second));
}

#[test]
fn test_empty_collection_is_data_error() {
    let dir = TempDir::new().unwrap();
    let store = MemoryDocumentStore::new();
    let config = config_for(&dir, 1);
    let layout = config.layout();

    let err = DataIngestion::new(&config, &layout, &store)
        .initiate_data_ingestion()
        .unwrap_err();
    assert_eq!(err.stage, Stage::Ingestion);
    assert!(matches!(err.kind(), FlightError::DataError(_)));
    assert!(!layout.feature_store_file_path.exists());
}

#[test]
fn test_unreachable_store_is_connectivity_error() {
    let dir = TempDir::new().unwrap();
    let store = FileDocumentStore::new(dir.path().join("no_such_store"));
    let config = config_for(&dir, 1);
    let layout = config.layout();

    let err = DataIngestion::new(&config, &layout, &store)
        .initiate_data_ingestion()
        .unwrap_err();
    assert_eq!(err.stage, Stage::Ingestion);
    assert!(matches!(err.kind(), FlightError::Connectivity(_)));
    assert!(err.kind().is_retryable());
}

#[test]
fn test_pushed_csv_round_trips_through_file_store() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("flights.csv");
    write_csv(&create_fares(12), &csv).unwrap();

    let store_root = dir.path().join("store");
    std::fs::create_dir_all(&store_root).unwrap();
    let store = FileDocumentStore::new(&store_root);
    assert_eq!(push_csv_file(&csv, &store, "FlightDB", "FlightData").unwrap(), 12);

    let config = config_for(&dir, 3);
    let layout = config.layout();
    let df = DataIngestion::new(&config, &layout, &store)
        .export_collection_as_dataframe()
        .unwrap();
    assert_eq!(df.height(), 12);
    assert_eq!(df.column("stops").unwrap().dtype(), &DataType::Int64);
    assert_eq!(df.column("price").unwrap().dtype(), &DataType::Float64);
}
