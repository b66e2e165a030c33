//! Documents stored in the search index.
//!
//! Field names are the contract the read API queries against; they must not
//! be renamed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::source::{ChangedGenre, ChangedPerson, Role, WorkId};

/// A person reference embedded in a work document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: Uuid,
    pub name: String,
}

/// Aggregate document for the `movies` index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkDocument {
    pub id: WorkId,
    pub imdb_rating: Option<f64>,
    pub genres: Vec<String>,
    pub title: String,
    pub description: Option<String>,
    pub directors_names: Vec<String>,
    pub actors_names: Vec<String>,
    pub writers_names: Vec<String>,
    pub directors: Vec<PersonRef>,
    pub actors: Vec<PersonRef>,
    pub writers: Vec<PersonRef>,
}

impl WorkDocument {
    /// Create a document with its scalar fields set and no people or genres.
    pub fn new(
        id: WorkId,
        title: String,
        description: Option<String>,
        imdb_rating: Option<f64>,
    ) -> Self {
        Self {
            id,
            imdb_rating,
            genres: Vec::new(),
            title,
            description,
            directors_names: Vec::new(),
            actors_names: Vec::new(),
            writers_names: Vec::new(),
            directors: Vec::new(),
            actors: Vec::new(),
            writers: Vec::new(),
        }
    }

    /// Add a person under a role.
    ///
    /// Returns `false` if a person with the same id is already listed for
    /// that role. The parallel names list is kept in step.
    pub fn add_person(&mut self, role: Role, person: PersonRef) -> bool {
        let (people, names) = match role {
            Role::Director => (&mut self.directors, &mut self.directors_names),
            Role::Actor => (&mut self.actors, &mut self.actors_names),
            Role::Writer => (&mut self.writers, &mut self.writers_names),
        };

        if people.iter().any(|p| p.id == person.id) {
            return false;
        }

        names.push(person.name.clone());
        people.push(person);
        true
    }

    /// Add a genre name, keeping insertion order. Returns `false` on duplicates.
    pub fn add_genre(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.genres.contains(&name) {
            return false;
        }
        self.genres.push(name);
        true
    }

    /// People listed under a role.
    pub fn people(&self, role: Role) -> &[PersonRef] {
        match role {
            Role::Director => &self.directors,
            Role::Actor => &self.actors,
            Role::Writer => &self.writers,
        }
    }
}

/// Document for the `genres` index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreDocument {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl From<&ChangedGenre> for GenreDocument {
    fn from(row: &ChangedGenre) -> Self {
        Self {
            id: row.id,
            name: row.name.clone(),
            description: row.description.clone(),
        }
    }
}

/// Document for the `persons` index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDocument {
    pub id: Uuid,
    pub full_name: String,
}

impl From<&ChangedPerson> for PersonDocument {
    fn from(row: &ChangedPerson) -> Self {
        Self {
            id: row.id,
            full_name: row.full_name.clone(),
        }
    }
}
