//! Work document assembly.
//!
//! Rebuilds the aggregate document of each impacted work from the flattened
//! join of works, people and genres.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::errors::PipelineError;
use crate::retry::Backoff;
use catalog_indexer_repository::SourceStore;
use catalog_indexer_shared::{PersonRef, Role, WorkDocument, WorkId, WorkRow};

/// Builds work documents from the catalog.
pub struct DocumentAssembler {
    source: Arc<dyn SourceStore>,
    backoff: Backoff,
}

impl DocumentAssembler {
    pub fn new(source: Arc<dyn SourceStore>, backoff: Backoff) -> Self {
        Self { source, backoff }
    }

    /// Assemble the documents of the given works.
    ///
    /// Works that no longer exist are absent from the result.
    #[instrument(skip(self, work_ids), fields(count = work_ids.len()))]
    pub async fn assemble(
        &self,
        work_ids: &[WorkId],
    ) -> Result<HashMap<WorkId, WorkDocument>, PipelineError> {
        if work_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = self
            .backoff
            .retry("work_rows", || self.source.work_rows(work_ids))
            .await?;
        let row_count = rows.len();

        let documents = fold_rows(rows);

        debug!(
            requested = work_ids.len(),
            rows = row_count,
            assembled = documents.len(),
            "Assembled work documents"
        );

        Ok(documents)
    }
}

/// Fold join rows into one document per work.
///
/// Scalar fields come from the first row of each work. People are listed
/// once per role, genres once per document, both in row order.
pub fn fold_rows(rows: impl IntoIterator<Item = WorkRow>) -> HashMap<WorkId, WorkDocument> {
    let mut documents: HashMap<WorkId, WorkDocument> = HashMap::new();

    for row in rows {
        let id = row.id;
        let document = documents
            .entry(id)
            .or_insert_with(|| WorkDocument::new(id, row.title, row.description, row.rating));

        if let (Some(role), Some(person_id), Some(full_name)) = (row.role, row.person_id, row.full_name) {
            match role.parse::<Role>() {
                Ok(role) => {
                    document.add_person(
                        role,
                        PersonRef {
                            id: person_id,
                            name: full_name,
                        },
                    );
                }
                Err(e) => {
                    warn!(work_id = %id, person_id = %person_id, error = %e, "Skipping person with unknown role");
                }
            }
        }

        if let Some(genre) = row.genre_name {
            document.add_genre(genre);
        }
    }

    documents
}
