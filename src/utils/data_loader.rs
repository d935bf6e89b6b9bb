//! Table and object persistence helpers
//!
//! CSV tables go through polars, fitted objects and arrays through bincode,
//! human-readable documents through serde_yaml.

use crate::error::{FlightError, Result};
use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Rows scanned when inferring CSV column types
const INFER_SCHEMA_ROWS: usize = 10_000;

/// Create the parent directory of `path` if needed
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| FlightError::io(dir, e))?;
        }
    }
    Ok(())
}

/// Load a CSV file with a header row
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path).map_err(|e| FlightError::io(path, e))?;

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| FlightError::DataError(format!("{}: {}", path.display(), e)))
}

/// Write a table as CSV with header, replacing any existing file
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut file = File::create(path).map_err(|e| FlightError::io(path, e))?;

    // CsvWriter needs a mutable frame to rechunk
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .map_err(|e| FlightError::DataError(format!("{}: {}", path.display(), e)))
}

/// Persist a serializable object (fitted preprocessor, model, array) with bincode
pub fn save_object<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path).map_err(|e| FlightError::io(path, e))?;
    bincode::serialize_into(BufWriter::new(file), value)?;
    Ok(())
}

/// Load an object written by [`save_object`]
pub fn load_object<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| FlightError::io(path, e))?;
    let value = bincode::deserialize_from(BufReader::new(file))?;
    Ok(value)
}

/// Read a YAML document
pub fn read_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| FlightError::io(path, e))?;
    let value = serde_yaml::from_reader(BufReader::new(file))?;
    Ok(value)
}

/// Write a YAML document, replacing any existing file
pub fn write_yaml_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path).map_err(|e| FlightError::io(path, e))?;
    serde_yaml::to_writer(BufWriter::new(file), value)?;
    Ok(())
}

/// Copy a file, creating the destination directory
pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    ensure_parent_dir(to)?;
    fs::copy(from, to).map_err(|e| FlightError::io(from, e))?;
    Ok(())
}

/// Whether a polars dtype holds numbers (booleans count, as in numeric drift checks)
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Column values as `f64`, nulls kept as `None`
pub fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| FlightError::FeatureNotFound(name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

/// Column values as strings, nulls kept as `None`
pub fn column_as_str(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| FlightError::FeatureNotFound(name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Column names in table order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}
