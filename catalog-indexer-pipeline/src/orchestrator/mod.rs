//! Orchestrator module for the catalog indexer pipeline.
//!
//! Runs sync passes (extract, resolve impact, aggregate, assemble and load,
//! advance the checkpoint) on a fixed interval until shut down.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::TryStreamExt;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::aggregator::IdAggregator;
use crate::assembler::DocumentAssembler;
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::errors::PipelineError;
use crate::extractor::{ChangeExtractor, Poll};
use crate::loader::SearchLoader;
use catalog_indexer_repository::catalog_indices;
use catalog_indexer_shared::{ChangeBatch, GenreDocument, PersonDocument, WorkDocument};

/// Configuration for the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Pause between the end of one pass and the start of the next.
    pub sync_interval: Duration,
    /// Number of work ids assembled and loaded together.
    pub chunk_size: usize,
    /// Number of chunks assembled and loaded at the same time.
    pub chunk_concurrency: usize,
    /// Subtracted from the pass stamp before it becomes the checkpoint.
    pub checkpoint_overlap: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(60),
            chunk_size: 100,
            chunk_concurrency: 1,
            checkpoint_overlap: Duration::ZERO,
        }
    }
}

/// Stage of a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Extracting,
    ResolvingImpact,
    Aggregating,
    AssemblingAndLoading,
    Advancing,
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PassState::Idle => "idle",
            PassState::Extracting => "extracting",
            PassState::ResolvingImpact => "resolving_impact",
            PassState::Aggregating => "aggregating",
            PassState::AssemblingAndLoading => "assembling_and_loading",
            PassState::Advancing => "advancing",
        };
        f.write_str(name)
    }
}

/// Logs state transitions of a single pass.
struct StateLog {
    current: PassState,
}

impl StateLog {
    fn new() -> Self {
        Self {
            current: PassState::Idle,
        }
    }

    fn enter(&mut self, next: PassState) {
        if next == self.current {
            return;
        }

        // Per-batch transitions repeat for every page.
        let per_batch = matches!(next, PassState::ResolvingImpact | PassState::Aggregating)
            || (self.current == PassState::Aggregating && next == PassState::Extracting);
        if per_batch {
            debug!(from = %self.current, to = %next, "Pass state changed");
        } else {
            info!(from = %self.current, to = %next, "Pass state changed");
        }
        self.current = next;
    }
}

/// Counters of a completed pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PassReport {
    /// Change batches read across all tables.
    pub batches: usize,
    /// Changed rows read across all tables.
    pub rows: usize,
    /// Work ids resolved from the batches, duplicates included.
    pub impacted_refs: usize,
    pub works_upserted: usize,
    pub genres_upserted: usize,
    pub persons_upserted: usize,
    /// Checkpoint persisted at the end of the pass.
    pub checkpoint: Checkpoint,
}

/// How a pass ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    /// Nothing changed since the checkpoint.
    NoUpdates,
    /// Changes were indexed and the checkpoint advanced.
    Synced(PassReport),
}

/// Requests a graceful stop of [`Orchestrator::run`].
///
/// The pass in progress finishes before the loop exits.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }
}

/// Orchestrator that coordinates the pipeline components.
///
/// The orchestrator:
/// - Creates missing indices on start
/// - Runs one sync pass per interval
/// - Advances the checkpoint only after a pass fully succeeded
/// - Stops on shutdown or when the checkpoint cannot be persisted
pub struct Orchestrator {
    extractor: ChangeExtractor,
    aggregator: IdAggregator,
    assembler: DocumentAssembler,
    loader: SearchLoader,
    checkpoint: Arc<dyn CheckpointStore>,
    config: OrchestratorConfig,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        extractor: ChangeExtractor,
        aggregator: IdAggregator,
        assembler: DocumentAssembler,
        loader: SearchLoader,
        checkpoint: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self::with_config(
            extractor,
            aggregator,
            assembler,
            loader,
            checkpoint,
            OrchestratorConfig::default(),
        )
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        extractor: ChangeExtractor,
        aggregator: IdAggregator,
        assembler: DocumentAssembler,
        loader: SearchLoader,
        checkpoint: Arc<dyn CheckpointStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            extractor,
            aggregator,
            assembler,
            loader,
            checkpoint,
            config,
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// A handle that stops [`Orchestrator::run`] after the current pass.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Run sync passes until shut down.
    ///
    /// A failed pass is logged and retried from the same checkpoint on the
    /// next interval. Checkpoint errors stop the loop and are returned.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), PipelineError> {
        info!(
            interval_secs = self.config.sync_interval.as_secs(),
            chunk_size = self.config.chunk_size,
            chunk_concurrency = self.config.chunk_concurrency,
            "Starting catalog indexer orchestrator"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        self.loader.ensure_indices(&catalog_indices()).await?;

        loop {
            match self.run_pass().await {
                Ok(PassOutcome::NoUpdates) => {
                    info!("No updates since last checkpoint");
                }
                Ok(PassOutcome::Synced(report)) => {
                    info!(
                        batches = report.batches,
                        rows = report.rows,
                        impacted = report.impacted_refs,
                        works = report.works_upserted,
                        genres = report.genres_upserted,
                        persons = report.persons_upserted,
                        checkpoint = %report.checkpoint.timestamp().to_rfc3339(),
                        "Sync pass complete"
                    );
                }
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Unrecoverable error, stopping sync loop");
                    return Err(e);
                }
                Err(e) => {
                    error!(error = %e, "Sync pass failed, checkpoint not advanced");
                }
            }

            if *shutdown_rx.borrow_and_update() {
                info!("Received shutdown signal");
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.sync_interval) => {}
                _ = shutdown_rx.wait_for(|stop| *stop) => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        info!("Orchestrator shutdown complete");
        Ok(())
    }

    /// Run a single sync pass.
    #[instrument(skip(self))]
    pub async fn run_pass(&self) -> Result<PassOutcome, PipelineError> {
        let mut state = StateLog::new();
        state.enter(PassState::Extracting);

        let overlap = chrono::Duration::from_std(self.config.checkpoint_overlap)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let stamp = Utc::now() - overlap;

        let since = self.checkpoint.read().await?;
        self.aggregator.reset().await?;

        let mut changes = match self.extractor.poll_changes(since.timestamp()).await? {
            Poll::Updates(changes) => changes,
            Poll::NoUpdates => {
                state.enter(PassState::Idle);
                return Ok(PassOutcome::NoUpdates);
            }
        };

        let mut report = PassReport::default();

        while let Some(batch) = changes.next_batch().await? {
            report.batches += 1;
            report.rows += batch.len();

            match &batch {
                ChangeBatch::Works(_) => {}
                ChangeBatch::People(rows) => {
                    let documents: Vec<PersonDocument> = rows.iter().map(PersonDocument::from).collect();
                    report.persons_upserted += self.loader.upsert(&documents).await?;
                }
                ChangeBatch::Genres(rows) => {
                    let documents: Vec<GenreDocument> = rows.iter().map(GenreDocument::from).collect();
                    report.genres_upserted += self.loader.upsert(&documents).await?;
                }
            }

            state.enter(PassState::ResolvingImpact);
            let impacted = self.extractor.resolve_impact(&batch).await?;
            report.impacted_refs += impacted.len();

            state.enter(PassState::Aggregating);
            self.aggregator.add(&impacted).await?;

            state.enter(PassState::Extracting);
        }

        state.enter(PassState::AssemblingAndLoading);
        report.works_upserted = self.load_works().await?;
        self.aggregator.clear().await?;

        state.enter(PassState::Advancing);
        let next = since.advance_to(stamp);
        self.checkpoint.write(next).await?;
        report.checkpoint = next;

        state.enter(PassState::Idle);
        Ok(PassOutcome::Synced(report))
    }

    /// Assemble and upsert every impacted work. Returns the number upserted.
    async fn load_works(&self) -> Result<usize, PipelineError> {
        let assembler = &self.assembler;
        let loader = &self.loader;

        self.aggregator
            .drain(self.config.chunk_size)
            .map_ok(|chunk| async move {
                let documents: Vec<WorkDocument> =
                    assembler.assemble(&chunk).await?.into_values().collect();
                loader.upsert(&documents).await
            })
            .try_buffer_unordered(self.config.chunk_concurrency.max(1))
            .try_fold(0usize, |total, upserted| async move {
                Ok::<_, PipelineError>(total + upserted)
            })
            .await
    }
}
