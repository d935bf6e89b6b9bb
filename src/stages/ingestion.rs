//! Data ingestion: document store to train/test CSV files

use super::artifacts::IngestionArtifact;
use crate::config::{ArtifactLayout, PipelineConfig};
use crate::error::{FlightError, Result, Stage, StageContext, StageResult};
use crate::store::{documents_to_dataframe, DocumentStore};
use crate::utils::write_csv;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

/// Number of test rows for `n` rows at `ratio`: rounded, and when there are
/// at least two rows, at least one row on each side
pub fn test_row_count(n: usize, ratio: f64) -> usize {
    if n < 2 {
        return 0;
    }
    let count = (n as f64 * ratio).round() as usize;
    count.clamp(1, n - 1)
}

pub struct DataIngestion<'a> {
    config: &'a PipelineConfig,
    layout: &'a ArtifactLayout,
    store: &'a dyn DocumentStore,
}

impl<'a> DataIngestion<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        layout: &'a ArtifactLayout,
        store: &'a dyn DocumentStore,
    ) -> Self {
        Self {
            config,
            layout,
            store,
        }
    }

    /// Every document of the configured collection as a table, without `_id`
    pub fn export_collection_as_dataframe(&self) -> Result<DataFrame> {
        let database = &self.config.store.database;
        let collection = &self.config.store.collection;
        info!(database = %database, collection = %collection, "exporting collection");

        let documents = self.store.fetch_all(database, collection)?;
        if documents.is_empty() {
            return Err(FlightError::DataError(format!(
                "collection {}.{} is empty",
                database, collection
            )));
        }

        let df = documents_to_dataframe(&documents)?;
        info!(rows = df.height(), columns = df.width(), "exported collection");
        Ok(df)
    }

    /// Write the full table to the feature store file
    pub fn export_data_into_feature_store(&self, df: &DataFrame) -> Result<()> {
        write_csv(df, &self.layout.feature_store_file_path)?;
        info!(path = %self.layout.feature_store_file_path.display(), "wrote feature store");
        Ok(())
    }

    /// Shuffle rows and split them into the ingested train and test files
    pub fn split_data_as_train_test(&self, df: &DataFrame) -> Result<(DataFrame, DataFrame)> {
        let n = df.height();
        let n_test = test_row_count(n, self.config.ingestion.train_test_split_ratio);

        let mut rng = match self.config.ingestion.random_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut indices: Vec<IdxSize> = (0..n as IdxSize).collect();
        indices.shuffle(&mut rng);

        let (test_idx, train_idx) = indices.split_at(n_test);
        let train = df.take(&IdxCa::from_vec("idx".into(), train_idx.to_vec()))?;
        let test = df.take(&IdxCa::from_vec("idx".into(), test_idx.to_vec()))?;

        write_csv(&train, &self.layout.ingested_train_file_path)?;
        write_csv(&test, &self.layout.ingested_test_file_path)?;
        info!(
            train_rows = train.height(),
            test_rows = test.height(),
            "split data into train and test"
        );
        Ok((train, test))
    }

    pub fn initiate_data_ingestion(&self) -> StageResult<IngestionArtifact> {
        let df = self
            .export_collection_as_dataframe()
            .stage_context(Stage::Ingestion, "exporting collection as dataframe")?;
        self.export_data_into_feature_store(&df)
            .stage_context(Stage::Ingestion, "exporting data into feature store")?;
        self.split_data_as_train_test(&df)
            .stage_context(Stage::Ingestion, "splitting data into train and test")?;

        let artifact = IngestionArtifact {
            train_file_path: self.layout.ingested_train_file_path.clone(),
            test_file_path: self.layout.ingested_test_file_path.clone(),
        };
        info!(?artifact, "data ingestion complete");
        Ok(artifact)
    }
}
