//! Dependency initialization and wiring for the catalog indexer.

use std::str::FromStr;
use std::sync::Arc;

use sqlx::postgres::PgConnectOptions;
use tracing::info;

use crate::config::SyncSettings;
use crate::IndexingError;
use catalog_indexer_pipeline::{
    aggregator::IdAggregator,
    assembler::DocumentAssembler,
    checkpoint::JsonFileCheckpoint,
    extractor::ChangeExtractor,
    loader::{LoaderConfig, SearchLoader},
    orchestrator::{Orchestrator, OrchestratorConfig},
    retry::Backoff,
};
use catalog_indexer_repository::{
    OpenSearchClient, PostgresSource, RedisIdSetStore, SearchEngineClient,
};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Connect to PostgreSQL, Redis and OpenSearch and wire the pipeline.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If a store is unreachable or misconfigured
    pub async fn new(settings: &SyncSettings) -> Result<Self, IndexingError> {
        info!(
            postgres_host = %settings.postgres.host,
            postgres_schema = %settings.postgres.schema,
            redis_url = %settings.redis_url,
            opensearch_url = %settings.opensearch_url,
            state_file = %settings.state_file.display(),
            "Initializing dependencies"
        );

        let backoff = Backoff::new(settings.backoff_initial, settings.backoff_max);

        // Initialize PostgreSQL source
        let source = Arc::new(PostgresSource::connect(pg_options(settings)?).await?);

        // Initialize Redis id set
        let id_set = RedisIdSetStore::new(&settings.redis_url).await?;
        info!("Redis connection established");

        // Initialize OpenSearch client
        let search_client = OpenSearchClient::new(&settings.opensearch_url)
            .await
            .map_err(|e| IndexingError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        // Verify OpenSearch is reachable
        let healthy = search_client
            .health_check()
            .await
            .map_err(|e| IndexingError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(IndexingError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        let extractor = ChangeExtractor::new(source.clone(), backoff).with_page_size(settings.batch_size);
        let aggregator =
            IdAggregator::new(Arc::new(id_set), backoff).with_key(settings.id_set_key.clone());
        let assembler = DocumentAssembler::new(source, backoff);
        let loader = SearchLoader::with_config(
            Arc::new(search_client),
            backoff,
            LoaderConfig {
                bulk_size: settings.batch_size,
            },
        );
        let checkpoint = Arc::new(JsonFileCheckpoint::new(settings.state_file.clone()));

        let orchestrator = Orchestrator::with_config(
            extractor,
            aggregator,
            assembler,
            loader,
            checkpoint,
            OrchestratorConfig {
                sync_interval: settings.sync_interval,
                chunk_size: settings.batch_size,
                chunk_concurrency: settings.chunk_concurrency,
                checkpoint_overlap: settings.checkpoint_overlap,
            },
        );

        Ok(Self { orchestrator })
    }
}

/// Connection options for the catalog database, with the catalog schema on
/// the `search_path`.
fn pg_options(settings: &SyncSettings) -> Result<PgConnectOptions, IndexingError> {
    let postgres = &settings.postgres;

    let options = match &postgres.url {
        Some(url) => PgConnectOptions::from_str(url)
            .map_err(|e| IndexingError::config(format!("Invalid DATABASE_URL: {}", e)))?,
        None => PgConnectOptions::new()
            .host(&postgres.host)
            .port(postgres.port)
            .username(&postgres.user)
            .password(&postgres.password)
            .database(&postgres.database),
    };

    Ok(options
        .application_name("catalog-indexer")
        .options([("search_path", postgres.schema.as_str())]))
}
