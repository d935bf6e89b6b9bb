//! In-memory document store

use super::{Document, DocumentStore, ID_FIELD};
use crate::error::Result;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Document store held in process memory
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<(String, String), Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub fn count(&self, database: &str, collection: &str) -> usize {
        self.collections
            .read()
            .get(&(database.to_string(), collection.to_string()))
            .map_or(0, Vec::len)
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn fetch_all(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        Ok(self
            .collections
            .read()
            .get(&(database.to_string(), collection.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn insert_many(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<usize> {
        let count = documents.len();
        let mut collections = self.collections.write();
        let target = collections
            .entry((database.to_string(), collection.to_string()))
            .or_default();

        for mut document in documents {
            document
                .entry(ID_FIELD)
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            target.push(document);
        }
        Ok(count)
    }
}
