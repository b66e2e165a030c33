//! Rows read from the relational catalog.
//!
//! The catalog has three change-tracked tables (`work`, `person`, `genre`),
//! each carrying a `modified` timestamp, and two join tables linking works
//! to people (with a role) and to genres.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a work (a film or series) in the catalog.
pub type WorkId = Uuid;

/// The change-tracked source tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTable {
    Work,
    Person,
    Genre,
}

impl SourceTable {
    /// All tables, in the order the extractor polls them.
    pub const ALL: [SourceTable; 3] = [SourceTable::Work, SourceTable::Person, SourceTable::Genre];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTable::Work => "work",
            SourceTable::Person => "person",
            SourceTable::Genre => "genre",
        }
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a person plays in a work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Director,
    Actor,
    Writer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Director => "director",
            Role::Actor => "actor",
            Role::Writer => "writer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "director" => Ok(Role::Director),
            "actor" => Ok(Role::Actor),
            "writer" => Ok(Role::Writer),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A changed row of the `work` table.
///
/// Only the identifier is needed: the work document is rebuilt from the
/// join query, not from this row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedWork {
    pub id: WorkId,
    pub modified: DateTime<Utc>,
}

/// A changed row of the `person` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedPerson {
    pub id: Uuid,
    pub full_name: String,
    pub modified: DateTime<Utc>,
}

/// A changed row of the `genre` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedGenre {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub modified: DateTime<Utc>,
}

/// Position in a table's change feed.
///
/// Rows are ordered by `(modified, id)`. A cursor without `id` selects every
/// row modified strictly after `modified`; with an `id` it also selects rows
/// sharing that timestamp but sorting after the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub modified: DateTime<Utc>,
    pub id: Option<Uuid>,
}

impl PageCursor {
    /// Cursor selecting every row modified after `since`.
    pub fn after(since: DateTime<Utc>) -> Self {
        Self {
            modified: since,
            id: None,
        }
    }

    /// Cursor positioned at a specific row.
    pub fn at(modified: DateTime<Utc>, id: Uuid) -> Self {
        Self {
            modified,
            id: Some(id),
        }
    }
}

/// A page of changed rows from one source table.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeBatch {
    Works(Vec<ChangedWork>),
    People(Vec<ChangedPerson>),
    Genres(Vec<ChangedGenre>),
}

impl ChangeBatch {
    /// An empty batch for the given table.
    pub fn empty(table: SourceTable) -> Self {
        match table {
            SourceTable::Work => ChangeBatch::Works(Vec::new()),
            SourceTable::Person => ChangeBatch::People(Vec::new()),
            SourceTable::Genre => ChangeBatch::Genres(Vec::new()),
        }
    }

    pub fn table(&self) -> SourceTable {
        match self {
            ChangeBatch::Works(_) => SourceTable::Work,
            ChangeBatch::People(_) => SourceTable::Person,
            ChangeBatch::Genres(_) => SourceTable::Genre,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ChangeBatch::Works(rows) => rows.len(),
            ChangeBatch::People(rows) => rows.len(),
            ChangeBatch::Genres(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifiers of the rows in this batch, in batch order.
    pub fn ids(&self) -> Vec<Uuid> {
        match self {
            ChangeBatch::Works(rows) => rows.iter().map(|r| r.id).collect(),
            ChangeBatch::People(rows) => rows.iter().map(|r| r.id).collect(),
            ChangeBatch::Genres(rows) => rows.iter().map(|r| r.id).collect(),
        }
    }

    /// Cursor positioned at the last row of the batch, if any.
    pub fn last_cursor(&self) -> Option<PageCursor> {
        match self {
            ChangeBatch::Works(rows) => rows.last().map(|r| PageCursor::at(r.modified, r.id)),
            ChangeBatch::People(rows) => rows.last().map(|r| PageCursor::at(r.modified, r.id)),
            ChangeBatch::Genres(rows) => rows.last().map(|r| PageCursor::at(r.modified, r.id)),
        }
    }
}

/// One row of the flattened work join query.
///
/// There is one row per (work, person, role) and (work, genre) pairing; the
/// work's scalar fields repeat on every row. Works without people or genres
/// produce a single row with all optional join columns empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkRow {
    pub id: WorkId,
    pub title: String,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub role: Option<String>,
    pub person_id: Option<Uuid>,
    pub full_name: Option<String>,
    pub genre_name: Option<String>,
}
