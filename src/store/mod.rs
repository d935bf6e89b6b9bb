//! Document store access
//!
//! Source records live in a document store as schemaless JSON objects,
//! grouped by database and collection. Ingestion only reads; the loader
//! utility bulk-inserts.

mod file;
pub mod loader;
mod memory;

pub use file::FileDocumentStore;
pub use loader::push_csv_file;
pub use memory::MemoryDocumentStore;

use crate::error::Result;
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use serde_json::{Map, Number, Value};

/// A stored record
pub type Document = Map<String, Value>;

/// Identity field added by the store, never part of the data
pub const ID_FIELD: &str = "_id";

/// Trait for document store backends
pub trait DocumentStore: Send + Sync {
    /// Every document of a collection, in insertion order
    fn fetch_all(&self, database: &str, collection: &str) -> Result<Vec<Document>>;

    /// Append documents to a collection, returning how many were written
    fn insert_many(&self, database: &str, collection: &str, documents: Vec<Document>)
        -> Result<usize>;
}

#[derive(Clone, Copy, PartialEq)]
enum Inferred {
    Unknown,
    Int,
    Float,
    Bool,
    Text,
}

impl Inferred {
    fn merge(self, value: &Value) -> Self {
        let seen = match value {
            Value::Null => return self,
            Value::Bool(_) => Inferred::Bool,
            Value::Number(n) if n.is_i64() => Inferred::Int,
            Value::Number(_) => Inferred::Float,
            _ => Inferred::Text,
        };
        match (self, seen) {
            (Inferred::Unknown, s) => s,
            (a, b) if a == b => a,
            (Inferred::Int, Inferred::Float) | (Inferred::Float, Inferred::Int) => Inferred::Float,
            _ => Inferred::Text,
        }
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Build a table from documents.
///
/// Columns are the union of keys in first-seen order, without [`ID_FIELD`].
/// A column of integers becomes `Int64`, of numbers `Float64`, of booleans
/// `Boolean`; anything else (including all-null) becomes `String`. Missing
/// keys are nulls.
pub fn documents_to_dataframe(documents: &[Document]) -> Result<DataFrame> {
    let mut names: Vec<&str> = Vec::new();
    for document in documents {
        for key in document.keys() {
            if key != ID_FIELD && !names.contains(&key.as_str()) {
                names.push(key);
            }
        }
    }

    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let values: Vec<&Value> = documents
            .iter()
            .map(|d| d.get(name).unwrap_or(&Value::Null))
            .collect();
        let kind = values.iter().fold(Inferred::Unknown, |k, v| k.merge(v));

        let column = match kind {
            Inferred::Int => Column::new(
                name.into(),
                values.iter().map(|v| v.as_i64()).collect::<Vec<_>>(),
            ),
            Inferred::Float => Column::new(
                name.into(),
                values.iter().map(|v| v.as_f64()).collect::<Vec<_>>(),
            ),
            Inferred::Bool => Column::new(
                name.into(),
                values.iter().map(|v| v.as_bool()).collect::<Vec<_>>(),
            ),
            Inferred::Text | Inferred::Unknown => Column::new(
                name.into(),
                values.iter().map(|v| value_as_text(v)).collect::<Vec<_>>(),
            ),
        };
        columns.push(column);
    }

    Ok(DataFrame::new(columns)?)
}

/// One document per row, keyed by column name. Nulls are kept as JSON null.
pub fn dataframe_to_documents(df: &DataFrame) -> Result<Vec<Document>> {
    let mut columns: Vec<(String, Vec<Value>)> = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let series = column.as_materialized_series();
        let dtype = series.dtype();
        let values: Vec<Value> = if matches!(dtype, DataType::Boolean) {
            series.bool()?.into_iter().map(|v| v.map_or(Value::Null, Value::Bool)).collect()
        } else if dtype.is_integer() {
            series
                .cast(&DataType::Int64)?
                .i64()?
                .into_iter()
                .map(|v| v.map_or(Value::Null, Value::from))
                .collect()
        } else if is_numeric_dtype(dtype) {
            series
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| v.and_then(Number::from_f64).map_or(Value::Null, Value::Number))
                .collect()
        } else {
            series
                .cast(&DataType::String)?
                .str()?
                .into_iter()
                .map(|v| v.map_or(Value::Null, |s| Value::String(s.to_string())))
                .collect()
        };
        columns.push((column.name().to_string(), values));
    }

    let documents = (0..df.height())
        .map(|row| {
            columns
                .iter()
                .map(|(name, values)| (name.clone(), values[row].clone()))
                .collect::<Document>()
        })
        .collect();
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_documents_to_dataframe_types_and_id() {
        let documents = vec![
            doc(json!({"_id": "a1", "airline": "IndiGo", "stops": 0, "duration": 2.5, "direct": true})),
            doc(json!({"_id": "a2", "airline": "Vistara", "stops": 1, "duration": 3, "direct": false})),
        ];
        let df = documents_to_dataframe(&documents).unwrap();

        assert_eq!(df.shape(), (2, 4));
        assert_eq!(
            crate::utils::column_names(&df),
            vec!["airline", "stops", "duration", "direct"]
        );
        assert_eq!(df.column("airline").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("stops").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("duration").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("direct").unwrap().dtype(), &DataType::Boolean);
    }

    #[test]
    fn test_missing_keys_and_mixed_values() {
        let documents = vec![
            doc(json!({"a": 1, "b": "x"})),
            doc(json!({"a": null, "b": 2, "c": 1.5})),
        ];
        let df = documents_to_dataframe(&documents).unwrap();

        assert_eq!(df.column("a").unwrap().null_count(), 1);
        // Mixed string and number falls back to text
        assert_eq!(df.column("b").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("c").unwrap().null_count(), 1);
    }

    #[test]
    fn test_dataframe_to_documents() {
        let df = df!(
            "airline" => &[Some("IndiGo"), None],
            "stops" => &[0i64, 2],
            "duration" => &[2.5, 4.0]
        )
        .unwrap();

        let documents = dataframe_to_documents(&df).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0]["airline"], json!("IndiGo"));
        assert_eq!(documents[0]["stops"], json!(0));
        assert_eq!(documents[1]["airline"], Value::Null);
        assert_eq!(documents[1]["duration"], json!(4.0));

        let back = documents_to_dataframe(&documents).unwrap();
        assert_eq!(back.column("stops").unwrap().dtype(), &DataType::Int64);
        assert_eq!(back.column("duration").unwrap().dtype(), &DataType::Float64);
    }
}
