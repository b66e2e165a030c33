//! Checkpoint persistence.
//!
//! The checkpoint is the timestamp a sync pass reads changes after. It only
//! ever moves forward and is written once per successful pass.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Key of the checkpoint inside the JSON state file.
pub const LAST_UPDATED_KEY: &str = "last_updated";

/// Errors raised while reading or persisting the checkpoint.
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// The state file could not be read or written.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// The state file exists but is not valid.
    #[error("Corrupt state: {0}")]
    CorruptState(String),
}

impl CheckpointError {
    /// Create a corrupt state error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptState(msg.into())
    }
}

/// Timestamp of the last successful sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checkpoint(DateTime<Utc>);

impl Checkpoint {
    /// The checkpoint of a catalog that was never synced:
    /// `0001-01-01T00:00:00Z`, the earliest instant PostgreSQL and the state
    /// file both represent.
    pub fn min() -> Self {
        let epoch = NaiveDate::from_ymd_opt(1, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self(epoch)
    }

    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self(timestamp)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }

    /// Move forward to `timestamp`, never backward.
    pub fn advance_to(self, timestamp: DateTime<Utc>) -> Self {
        Self(self.0.max(timestamp))
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::min()
    }
}

/// Durable storage for the checkpoint.
///
/// A single writer is assumed.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read the checkpoint, or [`Checkpoint::min`] if none was ever written.
    async fn read(&self) -> Result<Checkpoint, CheckpointError>;

    /// Durably replace the checkpoint.
    ///
    /// Implementations keep the later of the stored and the given value.
    async fn write(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError>;
}

/// Checkpoint stored in a JSON state file as `{"last_updated": "<RFC 3339>"}`.
///
/// Other keys in the file are preserved. Writes go to a sibling temporary
/// file which is synced and then renamed over the state file.
pub struct JsonFileCheckpoint {
    path: PathBuf,
}

impl JsonFileCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_state(&self) -> Result<Map<String, Value>, CheckpointError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(state)) => Ok(state),
            Ok(other) => Err(CheckpointError::corrupt(format!(
                "{} holds {} instead of an object",
                self.path.display(),
                other
            ))),
            Err(e) => Err(CheckpointError::corrupt(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Parse a stored timestamp.
///
/// Besides RFC 3339, accepts `YYYY-MM-DD HH:MM:SS[.ffffff]+HH:MM`, the format
/// older state files were written in.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z"))
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[async_trait]
impl CheckpointStore for JsonFileCheckpoint {
    async fn read(&self) -> Result<Checkpoint, CheckpointError> {
        let state = self.read_state().await?;

        let Some(raw) = state.get(LAST_UPDATED_KEY) else {
            debug!(path = %self.path.display(), "No checkpoint stored, starting from the beginning");
            return Ok(Checkpoint::min());
        };

        let timestamp = raw.as_str().and_then(parse_timestamp).ok_or_else(|| {
            CheckpointError::corrupt(format!("invalid {} value: {}", LAST_UPDATED_KEY, raw))
        })?;

        Ok(Checkpoint::new(timestamp))
    }

    async fn write(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        let mut state = self.read_state().await?;

        let current = state
            .get(LAST_UPDATED_KEY)
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .map(Checkpoint::new)
            .unwrap_or_default();
        let next = current.max(checkpoint);

        state.insert(
            LAST_UPDATED_KEY.to_string(),
            Value::String(next.timestamp().to_rfc3339()),
        );
        let contents = serde_json::to_vec_pretty(&Value::Object(state))
            .map_err(|e| CheckpointError::corrupt(e.to_string()))?;

        let temp_path = self.temp_path();
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(&contents).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp_path, &self.path).await?;

        info!(
            path = %self.path.display(),
            checkpoint = %next.timestamp().to_rfc3339(),
            "Checkpoint persisted"
        );
        Ok(())
    }
}
