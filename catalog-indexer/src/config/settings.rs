//! Runtime settings read from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::IndexingError;

const DEFAULT_POSTGRES_DB: &str = "movies_db";
const DEFAULT_POSTGRES_USER: &str = "postgres";
const DEFAULT_POSTGRES_PASSWORD: &str = "secret";
const DEFAULT_SQL_HOST: &str = "localhost";
const DEFAULT_SQL_PORT: u16 = 5432;
const DEFAULT_POSTGRES_SCHEMA: &str = "content";
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";
const DEFAULT_STATE_FILE: &str = "state.json";
const DEFAULT_ID_SET_KEY: &str = "work_ids";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = IndexingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" | "" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(IndexingError::config(format!("LOG_FORMAT must be pretty or json, got {}", other))),
        }
    }
}

/// Connection parameters of the catalog database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresSettings {
    /// Full connection URL; takes precedence over the individual parts.
    pub url: Option<String>,
    pub database: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Schema placed on the `search_path`.
    pub schema: String,
}

/// Settings of the indexer process.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    pub postgres: PostgresSettings,
    pub redis_url: String,
    pub opensearch_url: String,
    pub state_file: PathBuf,
    /// Page size of the extractor, chunk size of the drain and bulk size.
    pub batch_size: usize,
    pub sync_interval: Duration,
    pub checkpoint_overlap: Duration,
    pub chunk_concurrency: usize,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
    pub id_set_key: String,
    pub log_format: LogFormat,
}

impl SyncSettings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: PostgreSQL URL (default: built from the variables below)
    /// - `POSTGRES_DB`, `POSTGRES_USER`, `POSTGRES_PASSWORD`, `SQL_HOST`, `SQL_PORT`
    /// - `POSTGRES_SCHEMA`: schema of the catalog tables (default: content)
    /// - `REDIS_URL`: Redis URL (default: redis://localhost:6379/0)
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `STATE_FILE`: checkpoint file (default: state.json)
    /// - `BATCH_SIZE` (default: 100), `SYNC_INTERVAL_SECS` (default: 60)
    /// - `CHECKPOINT_OVERLAP_SECS` (default: 0), `CHUNK_CONCURRENCY` (default: 1)
    /// - `BACKOFF_INITIAL_MS` (default: 100), `BACKOFF_MAX_MS` (default: 10000)
    /// - `ID_SET_KEY` (default: work_ids), `LOG_FORMAT` (default: pretty)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns the value of a variable
    /// if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let postgres = PostgresSettings {
            url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database: text("POSTGRES_DB", DEFAULT_POSTGRES_DB),
            user: text("POSTGRES_USER", DEFAULT_POSTGRES_USER),
            password: text("POSTGRES_PASSWORD", DEFAULT_POSTGRES_PASSWORD),
            host: text("SQL_HOST", DEFAULT_SQL_HOST),
            port: number(&lookup, "SQL_PORT", DEFAULT_SQL_PORT)?,
            schema: text("POSTGRES_SCHEMA", DEFAULT_POSTGRES_SCHEMA),
        };

        let batch_size: usize = number(&lookup, "BATCH_SIZE", 100)?;
        if batch_size == 0 {
            return Err(IndexingError::config("BATCH_SIZE must be greater than zero"));
        }
        let chunk_concurrency: usize = number(&lookup, "CHUNK_CONCURRENCY", 1)?;
        if chunk_concurrency == 0 {
            return Err(IndexingError::config("CHUNK_CONCURRENCY must be greater than zero"));
        }

        let backoff_initial = Duration::from_millis(number(&lookup, "BACKOFF_INITIAL_MS", 100)?);
        let backoff_max = Duration::from_millis(number(&lookup, "BACKOFF_MAX_MS", 10_000)?);
        if backoff_initial > backoff_max {
            return Err(IndexingError::config(
                "BACKOFF_INITIAL_MS must not exceed BACKOFF_MAX_MS",
            ));
        }

        Ok(Self {
            postgres,
            redis_url: text("REDIS_URL", DEFAULT_REDIS_URL),
            opensearch_url: text("OPENSEARCH_URL", DEFAULT_OPENSEARCH_URL),
            state_file: PathBuf::from(text("STATE_FILE", DEFAULT_STATE_FILE)),
            batch_size,
            sync_interval: Duration::from_secs(number(&lookup, "SYNC_INTERVAL_SECS", 60)?),
            checkpoint_overlap: Duration::from_secs(number(&lookup, "CHECKPOINT_OVERLAP_SECS", 0)?),
            chunk_concurrency,
            backoff_initial,
            backoff_max,
            id_set_key: text("ID_SET_KEY", DEFAULT_ID_SET_KEY),
            log_format: lookup("LOG_FORMAT")
                .map(|value| value.parse::<LogFormat>())
                .transpose()?
                .unwrap_or(LogFormat::Pretty),
        })
    }
}

fn number<F, T>(lookup: &F, key: &str, default: T) -> Result<T, IndexingError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| IndexingError::config(format!("{} has invalid value {:?}: {}", key, raw, e))),
    }
}
