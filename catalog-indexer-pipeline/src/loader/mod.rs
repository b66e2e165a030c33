//! Loader module for the catalog indexer pipeline.
//!
//! Creates the catalog indices and upserts documents into them.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::errors::PipelineError;
use crate::retry::Backoff;
use catalog_indexer_repository::opensearch::{GENRES_INDEX, MOVIES_INDEX, PERSONS_INDEX};
use catalog_indexer_repository::{BulkDocument, IndexDefinition, SearchEngineClient};
use catalog_indexer_shared::{GenreDocument, PersonDocument, WorkDocument};

/// A document with a home index.
pub trait SearchDocument: Serialize + Send + Sync {
    /// Index the document is stored in.
    const INDEX: &'static str;

    /// Id of the document within the index.
    fn document_id(&self) -> String;
}

impl SearchDocument for WorkDocument {
    const INDEX: &'static str = MOVIES_INDEX;

    fn document_id(&self) -> String {
        self.id.to_string()
    }
}

impl SearchDocument for GenreDocument {
    const INDEX: &'static str = GENRES_INDEX;

    fn document_id(&self) -> String {
        self.id.to_string()
    }
}

impl SearchDocument for PersonDocument {
    const INDEX: &'static str = PERSONS_INDEX;

    fn document_id(&self) -> String {
        self.id.to_string()
    }
}

/// Configuration for the search loader.
#[derive(Debug, Clone, Copy)]
pub struct LoaderConfig {
    /// Maximum number of documents per bulk request.
    pub bulk_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { bulk_size: 100 }
    }
}

/// Loader that writes documents into the search engine.
///
/// The loader is responsible for:
/// - Creating missing indices with their mappings
/// - Splitting documents into bulk requests
/// - Retrying transient failures of each request
pub struct SearchLoader {
    client: Arc<dyn SearchEngineClient>,
    backoff: Backoff,
    config: LoaderConfig,
}

impl SearchLoader {
    /// Create a new search loader with the given client.
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self {
            client,
            backoff: Backoff::default(),
            config: LoaderConfig::default(),
        }
    }

    /// Create a new search loader with custom configuration.
    pub fn with_config(
        client: Arc<dyn SearchEngineClient>,
        backoff: Backoff,
        config: LoaderConfig,
    ) -> Self {
        Self {
            client,
            backoff,
            config,
        }
    }

    /// Create every index in `definitions` that does not exist yet.
    ///
    /// Safe to call on every start.
    #[instrument(skip(self, definitions))]
    pub async fn ensure_indices(&self, definitions: &[IndexDefinition]) -> Result<(), PipelineError> {
        for definition in definitions {
            let name = definition.name;
            let exists = self
                .backoff
                .retry("index_exists", || self.client.index_exists(name))
                .await?;

            if exists {
                debug!(index = %name, "Search index already exists");
                continue;
            }

            self.backoff
                .retry("create_index", || self.client.create_index(name, &definition.body))
                .await?;
            info!(index = %name, "Search index ready");
        }

        Ok(())
    }

    /// Upsert documents into their index.
    ///
    /// Returns the number of documents written. A rejected document fails the
    /// call; requests sent before it stay applied.
    #[instrument(skip(self, documents), fields(index = D::INDEX, count = documents.len()))]
    pub async fn upsert<D: SearchDocument>(&self, documents: &[D]) -> Result<usize, PipelineError> {
        if documents.is_empty() {
            return Ok(0);
        }

        let bulk: Vec<BulkDocument> = documents
            .iter()
            .map(|doc| BulkDocument::new(doc.document_id(), doc))
            .collect::<Result<_, _>>()?;

        let operation = format!("bulk_upsert:{}", D::INDEX);
        for chunk in bulk.chunks(self.config.bulk_size.max(1)) {
            self.backoff
                .retry(&operation, || self.client.bulk_upsert(D::INDEX, chunk))
                .await?;
        }

        debug!(index = D::INDEX, count = bulk.len(), "Upserted documents");
        Ok(bulk.len())
    }
}
