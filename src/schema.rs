//! Expected table schema

use crate::error::{FlightError, Result};
use crate::utils::read_yaml_file;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One expected column, written as `{name: dtype}` in the schema document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IndexMap<String, String>", into = "IndexMap<String, String>")]
pub struct ColumnSpec {
    pub name: String,
    pub dtype: String,
}

impl TryFrom<IndexMap<String, String>> for ColumnSpec {
    type Error = String;

    fn try_from(map: IndexMap<String, String>) -> std::result::Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(format!(
                "column entry must have exactly one name, found {}",
                map.len()
            ));
        }
        let (name, dtype) = map
            .into_iter()
            .next()
            .ok_or_else(|| "empty column entry".to_string())?;
        Ok(Self { name, dtype })
    }
}

impl From<ColumnSpec> for IndexMap<String, String> {
    fn from(spec: ColumnSpec) -> Self {
        let mut map = IndexMap::new();
        map.insert(spec.name, spec.dtype);
        map
    }
}

/// Schema document: the ordered column list plus the numeric subset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub numerical_columns: Vec<String>,
}

impl Schema {
    /// Load a schema document
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        read_yaml_file(path)
            .map_err(|e| FlightError::SchemaError(format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| FlightError::SchemaError(e.to_string()))
    }

    /// Number of expected columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Expected column names in schema order
    pub fn expected_columns(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Expected columns absent from `names`
    pub fn missing_columns<'a>(&'a self, names: &[String]) -> Vec<&'a str> {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| !names.iter().any(|n| n == name))
            .collect()
    }
}
