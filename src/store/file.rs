//! JSON-lines document store on the local filesystem

use super::{Document, DocumentStore, ID_FIELD};
use crate::error::{FlightError, Result};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Stores each collection as `<root>/<database>/<collection>.jsonl`,
/// one JSON object per line.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, database: &str, collection: &str) -> PathBuf {
        self.root.join(database).join(format!("{}.jsonl", collection))
    }
}

impl DocumentStore for FileDocumentStore {
    fn fetch_all(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        if !self.root.is_dir() {
            return Err(FlightError::Connectivity(format!(
                "document store root {} is not reachable",
                self.root.display()
            )));
        }

        let path = self.collection_path(database, collection);
        if !path.exists() {
            debug!(path = %path.display(), "collection file absent, treating as empty");
            return Ok(Vec::new());
        }

        let file = File::open(&path).map_err(|e| FlightError::io(&path, e))?;
        let mut documents = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| FlightError::io(&path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(&line)? {
                Value::Object(document) => documents.push(document),
                _ => {
                    return Err(FlightError::DataError(format!(
                        "{} line {}: not a JSON object",
                        path.display(),
                        line_no + 1
                    )))
                }
            }
        }
        Ok(documents)
    }

    fn insert_many(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<usize> {
        let path = self.collection_path(database, collection);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| FlightError::io(dir, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| FlightError::io(&path, e))?;
        let mut writer = BufWriter::new(file);

        let count = documents.len();
        for mut document in documents {
            if !document.contains_key(ID_FIELD) {
                document.insert(
                    ID_FIELD.to_string(),
                    Value::String(Uuid::new_v4().to_string()),
                );
            }
            serde_json::to_writer(&mut writer, &document)?;
            writer
                .write_all(b"\n")
                .map_err(|e| FlightError::io(&path, e))?;
        }
        writer.flush().map_err(|e| FlightError::io(&path, e))?;
        Ok(count)
    }
}
