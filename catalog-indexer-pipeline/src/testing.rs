//! In-memory implementations of the repository traits for tests.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointStore};
use catalog_indexer_repository::{
    BulkDocument, IdSetError, IdSetStore, SearchEngineClient, SearchError, SourceError,
    SourceStore,
};
use catalog_indexer_shared::{
    ChangeBatch, ChangedGenre, ChangedPerson, ChangedWork, PageCursor, SourceTable, WorkId,
    WorkRow,
};

#[derive(Clone)]
struct Work {
    title: String,
    rating: Option<f64>,
    modified: DateTime<Utc>,
}

#[derive(Default)]
struct Catalog {
    works: BTreeMap<Uuid, Work>,
    people: BTreeMap<Uuid, ChangedPerson>,
    genres: BTreeMap<Uuid, ChangedGenre>,
    person_work: Vec<(WorkId, Uuid, String)>,
    genre_work: Vec<(WorkId, Uuid)>,
}

impl Catalog {
    fn work_modified(&self, id: &WorkId) -> Option<DateTime<Utc>> {
        self.works.get(id).map(|w| w.modified)
    }
}

fn after(cursor: &PageCursor, modified: DateTime<Utc>, id: Uuid) -> bool {
    modified > cursor.modified || (modified == cursor.modified && cursor.id.is_some_and(|c| id > c))
}

/// Catalog held in memory, answering the same queries as PostgreSQL.
pub(crate) struct InMemorySource {
    catalog: Mutex<Catalog>,
    failures: Mutex<VecDeque<SourceError>>,
}

impl InMemorySource {
    pub(crate) fn new() -> Self {
        Self {
            catalog: Mutex::new(Catalog::default()),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Fail the next call with `error`.
    pub(crate) fn fail_next(&self, error: SourceError) {
        self.failures.lock().unwrap().push_back(error);
    }

    fn take_failure(&self) -> Result<(), SourceError> {
        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub(crate) fn insert_work(&self, title: &str, rating: Option<f64>, modified: DateTime<Utc>) -> WorkId {
        let id = Uuid::new_v4();
        self.catalog.lock().unwrap().works.insert(
            id,
            Work {
                title: title.to_string(),
                rating,
                modified,
            },
        );
        id
    }

    pub(crate) fn insert_person(&self, full_name: &str, modified: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.catalog.lock().unwrap().people.insert(
            id,
            ChangedPerson {
                id,
                full_name: full_name.to_string(),
                modified,
            },
        );
        id
    }

    pub(crate) fn insert_genre(&self, name: &str, modified: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.catalog.lock().unwrap().genres.insert(
            id,
            ChangedGenre {
                id,
                name: name.to_string(),
                description: None,
                modified,
            },
        );
        id
    }

    pub(crate) fn link_person(&self, work: WorkId, person: Uuid, role: &str) {
        self.catalog
            .lock()
            .unwrap()
            .person_work
            .push((work, person, role.to_string()));
    }

    pub(crate) fn link_genre(&self, work: WorkId, genre: Uuid) {
        self.catalog.lock().unwrap().genre_work.push((work, genre));
    }

    pub(crate) fn rename_person(&self, id: Uuid, full_name: &str, modified: DateTime<Utc>) {
        if let Some(person) = self.catalog.lock().unwrap().people.get_mut(&id) {
            person.full_name = full_name.to_string();
            person.modified = modified;
        }
    }

    /// Bump the modification time of a work without changing its content.
    pub(crate) fn touch_work(&self, id: WorkId, modified: DateTime<Utc>) {
        if let Some(work) = self.catalog.lock().unwrap().works.get_mut(&id) {
            work.modified = modified;
        }
    }

    pub(crate) fn rename_genre(&self, id: Uuid, name: &str, modified: DateTime<Utc>) {
        if let Some(genre) = self.catalog.lock().unwrap().genres.get_mut(&id) {
            genre.name = name.to_string();
            genre.modified = modified;
        }
    }

    pub(crate) fn work(&self, id: WorkId) -> ChangedWork {
        let catalog = self.catalog.lock().unwrap();
        ChangedWork {
            id,
            modified: catalog.works[&id].modified,
        }
    }

    pub(crate) fn person(&self, id: Uuid) -> ChangedPerson {
        self.catalog.lock().unwrap().people[&id].clone()
    }

    pub(crate) fn genre(&self, id: Uuid) -> ChangedGenre {
        self.catalog.lock().unwrap().genres[&id].clone()
    }
}

#[async_trait]
impl SourceStore for InMemorySource {
    async fn fetch_changes(
        &self,
        table: SourceTable,
        cursor: PageCursor,
        limit: usize,
    ) -> Result<ChangeBatch, SourceError> {
        self.take_failure()?;
        let catalog = self.catalog.lock().unwrap();

        let batch = match table {
            SourceTable::Work => {
                let mut rows: Vec<ChangedWork> = catalog
                    .works
                    .iter()
                    .filter(|(id, w)| after(&cursor, w.modified, **id))
                    .map(|(id, w)| ChangedWork {
                        id: *id,
                        modified: w.modified,
                    })
                    .collect();
                rows.sort_by_key(|r| (r.modified, r.id));
                rows.truncate(limit);
                ChangeBatch::Works(rows)
            }
            SourceTable::Person => {
                let mut rows: Vec<ChangedPerson> = catalog
                    .people
                    .values()
                    .filter(|p| after(&cursor, p.modified, p.id))
                    .cloned()
                    .collect();
                rows.sort_by_key(|r| (r.modified, r.id));
                rows.truncate(limit);
                ChangeBatch::People(rows)
            }
            SourceTable::Genre => {
                let mut rows: Vec<ChangedGenre> = catalog
                    .genres
                    .values()
                    .filter(|g| after(&cursor, g.modified, g.id))
                    .cloned()
                    .collect();
                rows.sort_by_key(|r| (r.modified, r.id));
                rows.truncate(limit);
                ChangeBatch::Genres(rows)
            }
        };

        Ok(batch)
    }

    async fn impacted_work_ids(
        &self,
        table: SourceTable,
        ids: &[Uuid],
    ) -> Result<Vec<WorkId>, SourceError> {
        self.take_failure()?;
        let catalog = self.catalog.lock().unwrap();

        let mut work_ids: Vec<WorkId> = match table {
            SourceTable::Work => return Ok(ids.to_vec()),
            SourceTable::Person => catalog
                .person_work
                .iter()
                .filter(|(_, person, _)| ids.contains(person))
                .map(|(work, _, _)| *work)
                .collect(),
            SourceTable::Genre => catalog
                .genre_work
                .iter()
                .filter(|(_, genre)| ids.contains(genre))
                .map(|(work, _)| *work)
                .collect(),
        };
        work_ids.retain(|id| catalog.works.contains_key(id));
        work_ids.sort_by_key(|id| catalog.work_modified(id));

        Ok(work_ids)
    }

    async fn work_rows(&self, work_ids: &[WorkId]) -> Result<Vec<WorkRow>, SourceError> {
        self.take_failure()?;
        let catalog = self.catalog.lock().unwrap();
        let mut rows = Vec::new();

        for id in work_ids {
            let Some(work) = catalog.works.get(id) else {
                continue;
            };

            let people: Vec<Option<(&Uuid, &String)>> = {
                let linked: Vec<_> = catalog
                    .person_work
                    .iter()
                    .filter(|(work_id, _, _)| work_id == id)
                    .map(|(_, person, role)| Some((person, role)))
                    .collect();
                if linked.is_empty() { vec![None] } else { linked }
            };
            let genres: Vec<Option<&Uuid>> = {
                let linked: Vec<_> = catalog
                    .genre_work
                    .iter()
                    .filter(|(work_id, _)| work_id == id)
                    .map(|(_, genre)| Some(genre))
                    .collect();
                if linked.is_empty() { vec![None] } else { linked }
            };

            for &person in &people {
                for &genre in &genres {
                    let person_row = person.and_then(|(pid, role)| {
                        catalog.people.get(pid).map(|p| (p, role.clone()))
                    });
                    rows.push(WorkRow {
                        id: *id,
                        title: work.title.clone(),
                        description: None,
                        rating: work.rating,
                        role: person_row.as_ref().map(|(_, role)| role.clone()),
                        person_id: person_row.as_ref().map(|(p, _)| p.id),
                        full_name: person_row.as_ref().map(|(p, _)| p.full_name.clone()),
                        genre_name: genre
                            .and_then(|gid| catalog.genres.get(gid))
                            .map(|g| g.name.clone()),
                    });
                }
            }
        }

        Ok(rows)
    }
}

/// Set store held in memory. Scan cursors are offsets into the sorted set.
pub(crate) struct InMemoryIdSet {
    sets: Mutex<HashMap<String, BTreeSet<WorkId>>>,
    failures: Mutex<VecDeque<IdSetError>>,
    repeat_scans: bool,
    unpaged_scans: bool,
    scans: AtomicUsize,
}

impl InMemoryIdSet {
    pub(crate) fn new() -> Self {
        Self {
            sets: Mutex::new(HashMap::new()),
            failures: Mutex::new(VecDeque::new()),
            repeat_scans: false,
            unpaged_scans: false,
            scans: AtomicUsize::new(0),
        }
    }

    /// Make every scan after the first also return the previous member, the
    /// way `SSCAN` may during a rehash.
    pub(crate) fn with_repeated_scans(mut self) -> Self {
        self.repeat_scans = true;
        self
    }

    /// Ignore the count hint and return the whole set in one reply, the way
    /// `SSCAN` does for small listpack or intset encoded sets.
    pub(crate) fn with_unpaged_scans(mut self) -> Self {
        self.unpaged_scans = true;
        self
    }

    pub(crate) fn fail_next(&self, error: IdSetError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub(crate) fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub(crate) fn members(&self, key: &str) -> Vec<WorkId> {
        self.sets
            .lock()
            .unwrap()
            .get(key)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn take_failure(&self) -> Result<(), IdSetError> {
        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IdSetStore for InMemoryIdSet {
    async fn add(&self, key: &str, ids: &[WorkId]) -> Result<(), IdSetError> {
        self.take_failure()?;
        self.sets
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .extend(ids.iter().copied());
        Ok(())
    }

    async fn scan(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<WorkId>), IdSetError> {
        self.take_failure()?;
        self.scans.fetch_add(1, Ordering::SeqCst);
        let members = self.members(key);
        if self.unpaged_scans {
            return Ok((0, members));
        }

        let cursor = cursor as usize;
        let end = (cursor + count).min(members.len());
        let start = if self.repeat_scans {
            cursor.saturating_sub(1)
        } else {
            cursor
        };
        let page = members.get(start.min(end)..end).unwrap_or_default().to_vec();
        let next = if end >= members.len() { 0 } else { end as u64 };

        Ok((next, page))
    }

    async fn clear(&self, key: &str) -> Result<(), IdSetError> {
        self.take_failure()?;
        self.sets.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Search engine held in memory. Upserts merge top-level fields.
pub(crate) struct InMemorySearch {
    indices: Mutex<HashMap<String, HashMap<String, Value>>>,
    failures: Mutex<VecDeque<SearchError>>,
    bulk_calls: AtomicUsize,
    upserted: Mutex<Vec<(String, String)>>,
}

impl InMemorySearch {
    pub(crate) fn new() -> Self {
        Self {
            indices: Mutex::new(HashMap::new()),
            failures: Mutex::new(VecDeque::new()),
            bulk_calls: AtomicUsize::new(0),
            upserted: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next bulk request with `error`.
    pub(crate) fn fail_next_bulk(&self, error: SearchError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub(crate) fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn has_index(&self, index: &str) -> bool {
        self.indices.lock().unwrap().contains_key(index)
    }

    pub(crate) fn document(&self, index: &str, id: impl ToString) -> Option<Value> {
        self.indices
            .lock()
            .unwrap()
            .get(index)
            .and_then(|docs| docs.get(&id.to_string()).cloned())
    }

    pub(crate) fn count(&self, index: &str) -> usize {
        self.indices
            .lock()
            .unwrap()
            .get(index)
            .map_or(0, HashMap::len)
    }

    /// Ids upserted into `index`, in request order, including repeats.
    pub(crate) fn upserted_ids(&self, index: &str) -> Vec<String> {
        self.upserted
            .lock()
            .unwrap()
            .iter()
            .filter(|(i, _)| i == index)
            .map(|(_, id)| id.clone())
            .collect()
    }

    pub(crate) fn clear_log(&self) {
        self.upserted.lock().unwrap().clear();
    }
}

#[async_trait]
impl SearchEngineClient for InMemorySearch {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        Ok(self.has_index(index))
    }

    async fn create_index(&self, index: &str, _body: &Value) -> Result<(), SearchError> {
        self.indices
            .lock()
            .unwrap()
            .entry(index.to_string())
            .or_default();
        Ok(())
    }

    async fn bulk_upsert(&self, index: &str, documents: &[BulkDocument]) -> Result<(), SearchError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let mut indices = self.indices.lock().unwrap();
        let docs = indices.entry(index.to_string()).or_default();
        let mut log = self.upserted.lock().unwrap();

        for document in documents {
            let stored = docs
                .entry(document.id.clone())
                .or_insert_with(|| Value::Object(Default::default()));
            if let (Value::Object(stored), Value::Object(fields)) = (stored, &document.source) {
                for (field, value) in fields {
                    stored.insert(field.clone(), value.clone());
                }
            }
            log.push((index.to_string(), document.id.clone()));
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        Ok(true)
    }
}

/// Checkpoint held in memory.
pub(crate) struct InMemoryCheckpoint {
    value: Mutex<Checkpoint>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryCheckpoint {
    pub(crate) fn new() -> Self {
        Self::starting_at(Checkpoint::min())
    }

    pub(crate) fn starting_at(checkpoint: Checkpoint) -> Self {
        Self {
            value: Mutex::new(checkpoint),
            writes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub(crate) fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub(crate) fn current(&self) -> Checkpoint {
        *self.value.lock().unwrap()
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpoint {
    async fn read(&self) -> Result<Checkpoint, CheckpointError> {
        Ok(self.current())
    }

    async fn write(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only file system").into());
        }
        let mut value = self.value.lock().unwrap();
        *value = (*value).max(checkpoint);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
