//! Bulk loading of CSV files into a collection

use super::{dataframe_to_documents, DocumentStore};
use crate::error::Result;
use crate::utils::read_csv;
use std::path::Path;
use tracing::info;

/// Read a CSV file and insert one document per row. Returns the row count.
pub fn push_csv_file(
    path: &Path,
    store: &dyn DocumentStore,
    database: &str,
    collection: &str,
) -> Result<usize> {
    let df = read_csv(path)?;
    let documents = dataframe_to_documents(&df)?;
    let inserted = store.insert_many(database, collection, documents)?;

    info!(
        file = %path.display(),
        database,
        collection,
        inserted,
        "pushed records to document store"
    );
    Ok(inserted)
}
