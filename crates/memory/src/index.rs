//! Inverted keyword index: term → ids of the documents containing it.
//!
//! The index only narrows the candidate set before scoring. It holds ids,
//! never content, and may briefly disagree with the document store; callers
//! skip ids the store no longer knows.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    path::PathBuf,
};

use {
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::{
    error::Result,
    snapshot::{self, SNAPSHOT_VERSION},
};

/// Per-term entry: documents containing the term and a cumulative insert count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Posting {
    pub docs: BTreeSet<String>,
    /// Total insertions for the term. Not decremented on removal.
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub term_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    path: Option<PathBuf>,
    terms: HashMap<String, Posting>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexSnapshot {
    version: u32,
    #[serde(default)]
    updated_at: Option<String>,
    terms: Vec<PostingEntry>,
}

#[derive(Serialize, Deserialize)]
struct PostingEntry {
    term: String,
    docs: Vec<String>,
    #[serde(default)]
    count: u64,
}

impl InvertedIndex {
    /// An index that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the index snapshot at `path`. Missing or corrupt files give an empty index.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut terms = HashMap::new();
        if let Some(snap) = snapshot::load::<IndexSnapshot>(&path, "index") {
            for entry in snap.terms {
                if entry.docs.is_empty() {
                    continue;
                }
                terms.insert(entry.term, Posting {
                    docs: entry.docs.into_iter().collect(),
                    count: entry.count,
                });
            }
        }
        debug!(path = %path.display(), terms = terms.len(), "loaded keyword index");
        Self {
            path: Some(path),
            terms,
        }
    }

    /// Add `id` to the posting of every token.
    pub fn index_document(&mut self, id: &str, tokens: &BTreeSet<String>) {
        for token in tokens {
            let posting = self.terms.entry(token.clone()).or_default();
            posting.docs.insert(id.to_string());
            posting.count += 1;
        }
    }

    /// Drop `id` from every posting and delete postings left empty.
    ///
    /// Returns the number of postings that referenced `id`.
    pub fn remove_document(&mut self, id: &str) -> usize {
        let mut touched = 0;
        self.terms.retain(|_, posting| {
            if posting.docs.remove(id) {
                touched += 1;
            }
            !posting.docs.is_empty()
        });
        touched
    }

    /// Union of the postings of `tokens`.
    pub fn candidates(&self, tokens: &BTreeSet<String>) -> HashSet<String> {
        tokens
            .iter()
            .filter_map(|t| self.terms.get(t))
            .flat_map(|posting| posting.docs.iter().cloned())
            .collect()
    }

    /// Whether every token of a document lists `id` in its posting.
    pub fn covers(&self, id: &str, tokens: &BTreeSet<String>) -> bool {
        tokens
            .iter()
            .all(|t| self.terms.get(t).is_some_and(|p| p.docs.contains(id)))
    }

    pub fn posting(&self, term: &str) -> Option<&Posting> {
        self.terms.get(term)
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            term_count: self.terms.len(),
        }
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }

    /// Write the snapshot. No-op for in-memory indexes.
    pub fn save(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let mut terms: Vec<PostingEntry> = self
            .terms
            .iter()
            .map(|(term, posting)| PostingEntry {
                term: term.clone(),
                docs: posting.docs.iter().cloned().collect(),
                count: posting.count,
            })
            .collect();
        terms.sort_by(|a, b| a.term.cmp(&b.term));

        snapshot::save(path, &IndexSnapshot {
            version: SNAPSHOT_VERSION,
            updated_at: Some(chrono::Utc::now().to_rfc3339()),
            terms,
        })
    }
}
