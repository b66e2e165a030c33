//! PostgreSQL source store.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::errors::SourceError;
use crate::interfaces::SourceStore;
use crate::postgres::queries;
use catalog_indexer_shared::{
    ChangeBatch, ChangedGenre, ChangedPerson, ChangedWork, PageCursor, SourceTable, WorkId,
    WorkRow,
};

/// Source store reading the catalog from PostgreSQL.
pub struct PostgresSource {
    pool: PgPool,
}

impl PostgresSource {
    /// Connect a small pool to the catalog database.
    ///
    /// The pipeline issues one query at a time per pass (plus one per
    /// concurrently processed chunk), so a handful of connections is enough.
    pub async fn connect(options: PgConnectOptions) -> Result<Self, SourceError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect_with(options)
            .await
            .map_err(|e| SourceError::connection(format!("Failed to connect to PostgreSQL: {}", e)))?;

        info!("Connected to PostgreSQL source");

        Ok(Self { pool })
    }

    fn row_to_work(row: &PgRow) -> Result<ChangedWork, SourceError> {
        Ok(ChangedWork {
            id: row.try_get("id")?,
            modified: row.try_get("modified")?,
        })
    }

    fn row_to_person(row: &PgRow) -> Result<ChangedPerson, SourceError> {
        Ok(ChangedPerson {
            id: row.try_get("id")?,
            full_name: row.try_get("full_name")?,
            modified: row.try_get("modified")?,
        })
    }

    fn row_to_genre(row: &PgRow) -> Result<ChangedGenre, SourceError> {
        Ok(ChangedGenre {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            modified: row.try_get("modified")?,
        })
    }

    fn row_to_work_row(row: &PgRow) -> Result<WorkRow, SourceError> {
        Ok(WorkRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            rating: row.try_get("rating")?,
            role: row.try_get("role")?,
            person_id: row.try_get("person_id")?,
            full_name: row.try_get("full_name")?,
            genre_name: row.try_get("genre_name")?,
        })
    }
}

#[async_trait]
impl SourceStore for PostgresSource {
    #[instrument(skip(self), fields(table = %table))]
    async fn fetch_changes(
        &self,
        table: SourceTable,
        cursor: PageCursor,
        limit: usize,
    ) -> Result<ChangeBatch, SourceError> {
        let sql = match table {
            SourceTable::Work => queries::CHANGED_WORKS,
            SourceTable::Person => queries::CHANGED_PEOPLE,
            SourceTable::Genre => queries::CHANGED_GENRES,
        };

        let rows = sqlx::query(sql)
            .bind(cursor.modified)
            .bind(cursor.id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        debug!(rows = rows.len(), "Fetched change page");

        let batch = match table {
            SourceTable::Work => ChangeBatch::Works(
                rows.iter().map(Self::row_to_work).collect::<Result<_, _>>()?,
            ),
            SourceTable::Person => ChangeBatch::People(
                rows.iter().map(Self::row_to_person).collect::<Result<_, _>>()?,
            ),
            SourceTable::Genre => ChangeBatch::Genres(
                rows.iter().map(Self::row_to_genre).collect::<Result<_, _>>()?,
            ),
        };

        Ok(batch)
    }

    async fn impacted_work_ids(
        &self,
        table: SourceTable,
        ids: &[Uuid],
    ) -> Result<Vec<WorkId>, SourceError> {
        let sql = match table {
            SourceTable::Work => return Ok(ids.to_vec()),
            SourceTable::Person => queries::WORKS_BY_PEOPLE,
            SourceTable::Genre => queries::WORKS_BY_GENRES,
        };

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let work_ids = sqlx::query_scalar::<_, Uuid>(sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(work_ids)
    }

    async fn work_rows(&self, work_ids: &[WorkId]) -> Result<Vec<WorkRow>, SourceError> {
        if work_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(queries::WORK_ROWS)
            .bind(work_ids)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_work_row).collect()
    }
}
