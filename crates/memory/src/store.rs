//! Authoritative document store, persisted as one JSON snapshot.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    path::PathBuf,
};

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    index::{IndexStats, InvertedIndex},
    snapshot::{self, SNAPSHOT_VERSION},
    tokenizer::tokenize,
};

/// Metadata key holding the RFC 3339 creation time.
pub const CREATED_AT: &str = "createdAt";
/// Metadata key holding the RFC 3339 time of the last full replace.
pub const UPDATED_AT: &str = "updatedAt";

/// One stored memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Tokenization of `content` taken at write time.
    #[serde(default)]
    pub keywords: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: usize,
}

#[derive(Serialize)]
struct StoreSnapshotRef<'a> {
    version: u32,
    records: &'a [MemoryRecord],
}

/// Accepted snapshot shapes. Older stores were a bare array of records.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoreFile {
    Versioned {
        #[allow(dead_code)]
        version: u32,
        records: Vec<MemoryRecord>,
    },
    Legacy(Vec<MemoryRecord>),
}

pub struct DocumentStore {
    path: Option<PathBuf>,
    records: Vec<MemoryRecord>,
    positions: HashMap<String, usize>,
    index: Option<InvertedIndex>,
}

impl DocumentStore {
    /// A store that is never written to disk.
    pub fn in_memory(index: Option<InvertedIndex>) -> Self {
        Self {
            path: None,
            records: Vec::new(),
            positions: HashMap::new(),
            index,
        }
    }

    /// Load the store snapshot at `path` and attach `index`.
    ///
    /// A missing or corrupt snapshot gives an empty store. An attached index
    /// that does not cover every record is rebuilt.
    pub fn open(path: impl Into<PathBuf>, index: Option<InvertedIndex>) -> Self {
        let path = path.into();
        let records = match snapshot::load::<StoreFile>(&path, "store") {
            Some(StoreFile::Versioned { records, .. }) | Some(StoreFile::Legacy(records)) => {
                records
            },
            None => Vec::new(),
        };

        let mut store = Self {
            path: Some(path),
            records: Vec::new(),
            positions: HashMap::new(),
            index,
        };
        for record in records {
            if let Some(&pos) = store.positions.get(&record.id) {
                warn!(id = %record.id, "duplicate id in store snapshot, keeping the later record");
                store.records[pos] = record;
            } else {
                store.positions.insert(record.id.clone(), store.records.len());
                store.records.push(record);
            }
        }
        debug!(records = store.records.len(), "loaded document store");

        if !store.index_is_consistent() {
            warn!("keyword index does not cover every record, rebuilding");
            if let Err(e) = store.reindex() {
                warn!(error = %e, "failed to persist rebuilt index");
            }
        }
        store
    }

    /// Store a new record. Fails with [`Error::DuplicateId`] if `id` exists.
    pub fn add(
        &mut self,
        id: impl Into<String>,
        content: impl Into<String>,
        mut metadata: Map<String, Value>,
    ) -> Result<MemoryRecord> {
        let id = id.into();
        if self.positions.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }
        let content = content.into();
        metadata.insert(CREATED_AT.into(), Value::String(now_rfc3339()));
        let record = MemoryRecord {
            keywords: tokenize(&content),
            id,
            content,
            metadata,
        };

        let index_before = self.index.clone();
        self.positions.insert(record.id.clone(), self.records.len());
        self.records.push(record.clone());
        if let Some(index) = self.index.as_mut() {
            index.index_document(&record.id, &record.keywords);
        }
        let id = record.id.clone();
        self.commit(move |store| {
            store.records.pop();
            store.positions.remove(&id);
            store.index = index_before;
        })?;
        debug!(id = %record.id, keywords = record.keywords.len(), "added memory");
        Ok(record)
    }

    /// Replace the content and metadata of an existing record.
    ///
    /// The record keeps its position and `createdAt`; `updatedAt` is set.
    pub fn replace(
        &mut self,
        id: &str,
        content: impl Into<String>,
        mut metadata: Map<String, Value>,
    ) -> Result<MemoryRecord> {
        let Some(&pos) = self.positions.get(id) else {
            return Err(Error::NotFound(id.to_string()));
        };
        let content = content.into();
        if let Some(created) = self.records[pos].metadata.get(CREATED_AT) {
            metadata.insert(CREATED_AT.into(), created.clone());
        }
        metadata.insert(UPDATED_AT.into(), Value::String(now_rfc3339()));
        let record = MemoryRecord {
            id: id.to_string(),
            keywords: tokenize(&content),
            content,
            metadata,
        };

        let index_before = self.index.clone();
        let previous = std::mem::replace(&mut self.records[pos], record.clone());
        if let Some(index) = self.index.as_mut() {
            index.remove_document(id);
            index.index_document(id, &record.keywords);
        }
        self.commit(move |store| {
            store.records[pos] = previous;
            store.index = index_before;
        })?;
        debug!(id, keywords = record.keywords.len(), "replaced memory");
        Ok(record)
    }

    pub fn get(&self, id: &str) -> Result<&MemoryRecord> {
        self.find(id).ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn find(&self, id: &str) -> Option<&MemoryRecord> {
        self.positions.get(id).map(|&pos| &self.records[pos])
    }

    /// Insertion-order position of `id`.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Delete a record and its postings. Fails with [`Error::NotFound`] on unknown ids.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let Some(&pos) = self.positions.get(id) else {
            return Err(Error::NotFound(id.to_string()));
        };
        let index_before = self.index.clone();
        let removed = self.records.remove(pos);
        self.rebuild_positions();
        if let Some(index) = self.index.as_mut() {
            index.remove_document(id);
        }
        self.commit(move |store| {
            store.records.insert(pos, removed);
            store.rebuild_positions();
            store.index = index_before;
        })?;
        debug!(id, "removed memory");
        Ok(true)
    }

    /// All records in insertion order.
    pub fn all(&self) -> std::slice::Iter<'_, MemoryRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            total: self.records.len(),
        }
    }

    pub fn index(&self) -> Option<&InvertedIndex> {
        self.index.as_ref()
    }

    /// Candidate ids for `tokens`, or `None` when no index is attached.
    pub fn candidates(&self, tokens: &BTreeSet<String>) -> Option<HashSet<String>> {
        self.index.as_ref().map(|index| index.candidates(tokens))
    }

    /// Rebuild the attached index from every record and persist it.
    pub fn reindex(&mut self) -> Result<Option<IndexStats>> {
        let Some(index) = self.index.as_mut() else {
            return Ok(None);
        };
        index.clear();
        for record in &self.records {
            index.index_document(&record.id, &record.keywords);
        }
        index.save()?;
        let stats = index.stats();
        info!(
            documents = self.records.len(),
            terms = stats.term_count,
            "rebuilt keyword index"
        );
        Ok(Some(stats))
    }

    fn index_is_consistent(&self) -> bool {
        let Some(index) = self.index.as_ref() else {
            return true;
        };
        self.records
            .iter()
            .all(|r| index.covers(&r.id, &r.keywords))
    }

    fn rebuild_positions(&mut self) {
        self.positions = self
            .records
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.id.clone(), pos))
            .collect();
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        snapshot::save(path, &StoreSnapshotRef {
            version: SNAPSHOT_VERSION,
            records: &self.records,
        })
    }

    fn save_index(&self) -> Result<()> {
        match self.index.as_ref() {
            Some(index) => index.save(),
            None => Ok(()),
        }
    }

    /// Write the store snapshot, then the index snapshot.
    ///
    /// If either write fails, `undo` reverts the in-memory change, the
    /// previous state is written back where possible, and the first error is
    /// returned.
    fn commit(&mut self, undo: impl FnOnce(&mut Self)) -> Result<()> {
        let Err(e) = self.persist().and_then(|()| self.save_index()) else {
            return Ok(());
        };
        undo(self);
        if let Err(restore) = self.persist().and_then(|()| self.save_index()) {
            warn!(error = %restore, "failed to restore snapshots after a failed write");
        }
        Err(e)
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
