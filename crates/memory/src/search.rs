//! Candidate scoring and ranking.

use std::collections::{BTreeSet, HashSet};

use {
    serde::{Deserialize, Serialize},
    tracing::warn,
};

use crate::{similarity::jaccard, store::DocumentStore};

/// A single ranked memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub score: f64,
}

/// The payload kept in the result cache: an owned copy, detached from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    pub query: String,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub duration_ms: f64,
    pub cached: bool,
}

/// Score `candidates` (every record when `None`) against `query_tokens`.
///
/// Zero scores are dropped. Results are ordered by descending score, ties in
/// store insertion order, and truncated to `limit`. Candidate ids the store
/// does not know are skipped.
pub fn rank(
    store: &DocumentStore,
    query_tokens: &BTreeSet<String>,
    candidates: Option<&HashSet<String>>,
    limit: usize,
) -> Vec<SearchHit> {
    if query_tokens.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut positions: Vec<usize> = match candidates {
        Some(ids) => ids
            .iter()
            .filter_map(|id| {
                let pos = store.position(id);
                if pos.is_none() {
                    warn!(id = %id, "stale index reference, skipping");
                }
                pos
            })
            .collect(),
        None => (0..store.len()).collect(),
    };
    positions.sort_unstable();

    let records = store.all().as_slice();
    let mut scored: Vec<(usize, f64)> = positions
        .into_iter()
        .map(|pos| (pos, jaccard(query_tokens, &records[pos].keywords)))
        .filter(|(_, score)| *score > 0.0)
        .collect();
    // Stable: equal scores keep insertion order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);

    scored
        .into_iter()
        .map(|(pos, score)| SearchHit {
            id: records[pos].id.clone(),
            content: records[pos].content.clone(),
            score,
        })
        .collect()
}
