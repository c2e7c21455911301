/// Memory manager: owns the document store, keyword index and result cache,
/// and answers queries through them.
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use {
    serde::Serialize,
    serde_json::{Map, Value},
    sha2::{Digest, Sha256},
    tracing::{debug, info, warn},
    walkdir::WalkDir,
};

use crate::{
    cache::{CacheStats, LruCache},
    config::MemoryConfig,
    error::{Error, Result},
    index::{IndexStats, InvertedIndex},
    search::{self, CachedResult, SearchResponse},
    store::{DocumentStore, MemoryRecord},
    tokenizer::tokenize,
};

/// Metadata key for the file a memory was imported from.
pub const SOURCE_PATH: &str = "sourcePath";
/// Metadata key for the SHA-256 of the imported file content.
pub const CONTENT_HASH: &str = "contentHash";

pub struct MemoryManager {
    config: MemoryConfig,
    store: DocumentStore,
    cache: LruCache<CachedResult>,
    retrievals: u64,
    cache_hits: u64,
    retrieval_time: Duration,
}

/// Counts and timings for the memory system.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub total_documents: usize,
    pub indexed: bool,
    pub term_count: usize,
    pub cache: CacheStats,
    /// Searches served by this manager since it was opened.
    pub total_retrievals: u64,
    pub cache_hits: u64,
    pub avg_retrieval_ms: f64,
}

/// Bulk import report.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub skipped: usize,
    pub errors: usize,
}

enum ImportOutcome {
    Added,
    Updated,
    Unchanged,
    Removed,
    Skipped,
}

impl MemoryManager {
    /// Open the snapshots under `config.data_dir`. Unreadable snapshots start empty.
    pub fn open(config: MemoryConfig) -> Self {
        let index = config
            .use_index
            .then(|| InvertedIndex::load(config.index_path()));
        let store = DocumentStore::open(config.store_path(), index);
        let cache = LruCache::load(
            config.cache_path(),
            config.cache_capacity,
            config.cache_max_age,
            config.flush_policy,
        );
        info!(
            data_dir = %config.data_dir.display(),
            documents = store.len(),
            cached = cache.len(),
            "opened memory store"
        );
        Self::from_parts(config, store, cache)
    }

    /// A manager that keeps everything in memory; `config.data_dir` is ignored.
    pub fn in_memory(config: MemoryConfig) -> Self {
        let index = config.use_index.then(InvertedIndex::in_memory);
        let store = DocumentStore::in_memory(index);
        let cache = LruCache::in_memory(config.cache_capacity, config.cache_max_age);
        Self::from_parts(config, store, cache)
    }

    fn from_parts(
        config: MemoryConfig,
        store: DocumentStore,
        cache: LruCache<CachedResult>,
    ) -> Self {
        Self {
            config,
            store,
            cache,
            retrievals: 0,
            cache_hits: 0,
            retrieval_time: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Store a new memory. Fails with [`Error::DuplicateId`] if `id` exists.
    ///
    /// Writes clear the result cache first; a cache that cannot be persisted
    /// fails the call before the store is touched.
    pub fn add_memory(
        &mut self,
        id: impl Into<String>,
        content: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> Result<MemoryRecord> {
        let id = id.into();
        if self.store.find(&id).is_some() {
            return Err(Error::DuplicateId(id));
        }
        self.invalidate_cache()?;
        self.store.add(id, content, metadata)
    }

    pub fn replace_memory(
        &mut self,
        id: &str,
        content: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> Result<MemoryRecord> {
        self.store.get(id)?;
        self.invalidate_cache()?;
        self.store.replace(id, content, metadata)
    }

    /// Add `id`, or replace it when it already exists.
    pub fn upsert_memory(
        &mut self,
        id: &str,
        content: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> Result<MemoryRecord> {
        if self.store.find(id).is_some() {
            self.replace_memory(id, content, metadata)
        } else {
            self.add_memory(id, content, metadata)
        }
    }

    pub fn get_memory(&self, id: &str) -> Result<&MemoryRecord> {
        self.store.get(id)
    }

    pub fn remove_memory(&mut self, id: &str) -> Result<bool> {
        self.store.get(id)?;
        self.invalidate_cache()?;
        self.store.remove(id)
    }

    /// Search memories for `query`, returning at most `limit` results
    /// (the configured default when `None`).
    ///
    /// Never fails: a cache that cannot be persisted is logged and skipped.
    pub fn search(&mut self, query: &str, limit: Option<usize>) -> SearchResponse {
        let start = Instant::now();
        let limit = limit
            .unwrap_or(self.config.default_limit)
            .min(self.config.max_limit);
        let key = query_fingerprint(query, limit);

        if let Some(cached) = self.cache.get(&key) {
            let elapsed = start.elapsed();
            self.record_retrieval(elapsed, true);
            debug!(query, results = cached.results.len(), "served search from cache");
            return SearchResponse {
                query: query.to_string(),
                results: cached.results,
                duration_ms: as_millis_f64(elapsed),
                cached: true,
            };
        }

        let tokens = tokenize(query);
        let results = if tokens.is_empty() {
            Vec::new()
        } else {
            let candidates = self.store.candidates(&tokens);
            let results = search::rank(&self.store, &tokens, candidates.as_ref(), limit);
            if let Err(e) = self.cache.set(key, CachedResult {
                query: query.to_string(),
                results: results.clone(),
            }) {
                warn!(error = %e, "failed to persist result cache");
            }
            results
        };

        let elapsed = start.elapsed();
        self.record_retrieval(elapsed, false);
        debug!(
            query,
            tokens = tokens.len(),
            results = results.len(),
            "searched memories"
        );
        SearchResponse {
            query: query.to_string(),
            results,
            duration_ms: as_millis_f64(elapsed),
            cached: false,
        }
    }

    /// Rebuild the keyword index from every stored memory.
    ///
    /// Returns `None` when indexing is disabled.
    pub fn rebuild_index(&mut self) -> Result<Option<IndexStats>> {
        self.invalidate_cache()?;
        self.store.reindex()
    }

    /// Empty the result cache, leaving memories and index untouched.
    pub fn clear_cache(&mut self) -> Result<()> {
        self.cache.clear()?;
        self.cache.flush()
    }

    /// Persist pending cache bookkeeping. Memories and the index are
    /// written by every mutating call already.
    pub fn flush(&mut self) -> Result<()> {
        self.cache.flush()
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            total_documents: self.store.stats().total,
            indexed: self.store.index().is_some(),
            term_count: self.store.index().map_or(0, |i| i.stats().term_count),
            cache: self.cache.stats(),
            total_retrievals: self.retrievals,
            cache_hits: self.cache_hits,
            avg_retrieval_ms: if self.retrievals > 0 {
                as_millis_f64(self.retrieval_time) / self.retrievals as f64
            } else {
                0.0
            },
        }
    }

    /// Import text files under `dirs` as memories.
    ///
    /// Ids are `<dir name>/<relative path without extension>`. Unchanged files
    /// (same content hash) are skipped, changed files replace their memory, and
    /// memories whose source file disappeared from an imported directory are
    /// removed.
    pub fn import_dirs(&mut self, dirs: &[PathBuf]) -> ImportReport {
        let mut report = ImportReport::default();
        let mut seen = HashSet::new();

        for dir in dirs {
            if !dir.exists() {
                debug!(?dir, "import directory does not exist, skipping");
                continue;
            }

            for entry in WalkDir::new(dir).follow_links(true) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(?dir, error = %e, "failed to read directory entry");
                        report.errors += 1;
                        continue;
                    },
                };
                let path = entry.path();
                if !path.is_file() || !self.accepts_extension(path) {
                    continue;
                }

                let id = import_id(dir, path);
                seen.insert(id.clone());
                match self.import_file(path, &id) {
                    Ok(ImportOutcome::Added) => report.added += 1,
                    Ok(ImportOutcome::Updated) => report.updated += 1,
                    Ok(ImportOutcome::Unchanged) => report.unchanged += 1,
                    Ok(ImportOutcome::Removed) => report.removed += 1,
                    Ok(ImportOutcome::Skipped) => report.skipped += 1,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "failed to import file");
                        report.errors += 1;
                    },
                }
            }
        }

        let vanished: Vec<String> = self
            .store
            .all()
            .filter(|r| !seen.contains(&r.id))
            .filter(|r| {
                r.metadata
                    .get(SOURCE_PATH)
                    .and_then(Value::as_str)
                    .map(Path::new)
                    .is_some_and(|p| dirs.iter().any(|d| p.starts_with(d)) && !p.exists())
            })
            .map(|r| r.id.clone())
            .collect();
        for id in vanished {
            info!(id = %id, "removing memory whose source file was deleted");
            match self.remove_memory(&id) {
                Ok(_) => report.removed += 1,
                Err(e) => {
                    warn!(id = %id, error = %e, "failed to remove memory");
                    report.errors += 1;
                },
            }
        }

        info!(
            added = report.added,
            updated = report.updated,
            unchanged = report.unchanged,
            removed = report.removed,
            errors = report.errors,
            "import finished"
        );
        report
    }

    fn import_file(&mut self, path: &Path, id: &str) -> Result<ImportOutcome> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        if content.trim().is_empty() {
            if self.store.find(id).is_none() {
                return Ok(ImportOutcome::Skipped);
            }
            self.remove_memory(id)?;
            debug!(id, "removed memory whose source file is now empty");
            return Ok(ImportOutcome::Removed);
        }
        let hash = sha256_hex(&content);

        let existing = self.store.find(id);
        if let Some(record) = existing
            && record.metadata.get(CONTENT_HASH).and_then(Value::as_str) == Some(hash.as_str())
        {
            return Ok(ImportOutcome::Unchanged);
        }
        let exists = existing.is_some();

        let mut metadata = Map::new();
        metadata.insert("type".into(), "file".into());
        metadata.insert(SOURCE_PATH.into(), path.display().to_string().into());
        metadata.insert(CONTENT_HASH.into(), hash.into());
        if let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) {
            let modified: chrono::DateTime<chrono::Utc> = modified.into();
            metadata.insert("lastModified".into(), modified.to_rfc3339().into());
        }

        if exists {
            self.replace_memory(id, content, metadata)?;
            debug!(id, "updated imported memory");
            Ok(ImportOutcome::Updated)
        } else {
            self.add_memory(id, content, metadata)?;
            debug!(id, "imported memory");
            Ok(ImportOutcome::Added)
        }
    }

    fn accepts_extension(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.config
            .import_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    /// Drop cached results ahead of a write. The cleared cache reaches disk
    /// regardless of the flush policy, so a reopen never serves results from
    /// before the write.
    fn invalidate_cache(&mut self) -> Result<()> {
        if !self.config.invalidate_on_write {
            return Ok(());
        }
        if !self.cache.is_empty() {
            self.cache.clear()?;
        }
        self.cache.flush()
    }

    fn record_retrieval(&mut self, elapsed: Duration, cached: bool) {
        self.retrievals += 1;
        self.retrieval_time += elapsed;
        if cached {
            self.cache_hits += 1;
        }
    }
}

/// Cache key for a query and result limit.
pub fn query_fingerprint(query: &str, limit: usize) -> String {
    format!("query:{}", sha256_hex(&format!("{limit}:{}", query.trim())))
}

fn import_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    let relative = relative.to_string_lossy().replace('\\', "/");
    match root.file_name() {
        Some(name) => format!("{}/{relative}", name.to_string_lossy()),
        None => relative,
    }
}

fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn as_millis_f64(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use {super::*, serde_json::json, tempfile::TempDir};

    fn meta(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn config_in(tmp: &TempDir) -> MemoryConfig {
        MemoryConfig {
            data_dir: tmp.path().join("data"),
            import_dirs: vec![tmp.path().join("daily")],
            ..MemoryConfig::default()
        }
    }

    fn seeded(manager: &mut MemoryManager) {
        manager
            .add_memory(
                "t1",
                "康仔是数字生命致力于秒级记忆检索",
                meta(json!({"type": "identity"})),
            )
            .unwrap();
        manager
            .add_memory(
                "t2",
                "秒级记忆检索目标响应时间小于10毫秒",
                meta(json!({"type": "goal"})),
            )
            .unwrap();
    }

    #[test]
    fn finds_both_records_for_shared_bigram() {
        let mut manager = MemoryManager::in_memory(MemoryConfig::default());
        seeded(&mut manager);

        let response = manager.search("检索", None);
        assert!(!response.cached);
        let ids: Vec<&str> = response.results.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"t1") && ids.contains(&"t2"));
        assert!(response.results.iter().all(|h| h.score > 0.0));
        assert!(response.results[0].score >= response.results[1].score);
        // t2 has fewer surviving keywords, so the shared bigram weighs more.
        assert_eq!(ids[0], "t2");
    }

    #[test]
    fn disjoint_query_returns_nothing() {
        let mut manager = MemoryManager::in_memory(MemoryConfig::default());
        seeded(&mut manager);

        assert!(manager.search("天气预报", None).results.is_empty());
    }

    #[test]
    fn empty_query_returns_nothing() {
        let mut manager = MemoryManager::in_memory(MemoryConfig::default());
        seeded(&mut manager);

        assert!(manager.search("", None).results.is_empty());
        assert!(manager.search("   ", None).results.is_empty());
        assert!(manager.search("the and", None).results.is_empty());
    }

    #[test]
    fn repeated_search_is_served_from_cache() {
        let mut manager = MemoryManager::in_memory(MemoryConfig::default());
        seeded(&mut manager);

        let first = manager.search("秒级记忆", Some(5));
        let second = manager.search("秒级记忆", Some(5));

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.results, second.results);
        assert_eq!(second.query, "秒级记忆");

        let stats = manager.stats();
        assert_eq!(stats.total_retrievals, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache.hits, 1);
    }

    #[test]
    fn limit_is_part_of_the_cache_key() {
        let mut manager = MemoryManager::in_memory(MemoryConfig::default());
        seeded(&mut manager);

        assert_eq!(manager.search("检索", Some(1)).results.len(), 1);
        let wider = manager.search("检索", Some(2));
        assert!(!wider.cached);
        assert_eq!(wider.results.len(), 2);
    }

    #[test]
    fn limit_is_clamped_to_max() {
        let config = MemoryConfig {
            max_limit: 1,
            ..MemoryConfig::default()
        };
        let mut manager = MemoryManager::in_memory(config);
        seeded(&mut manager);

        assert_eq!(manager.search("检索", Some(50)).results.len(), 1);
    }

    #[test]
    fn writes_invalidate_cached_results() {
        let mut manager = MemoryManager::in_memory(MemoryConfig::default());
        seeded(&mut manager);
        assert_eq!(manager.search("检索", None).results.len(), 2);

        manager.add_memory("t3", "检索", Map::new()).unwrap();
        let after_add = manager.search("检索", None);
        assert!(!after_add.cached);
        assert_eq!(after_add.results.len(), 3);
        assert_eq!(after_add.results[0].id, "t3");

        manager.remove_memory("t3").unwrap();
        let after_remove = manager.search("检索", None);
        assert!(!after_remove.cached);
        assert_eq!(after_remove.results.len(), 2);
    }

    #[test]
    fn stale_cache_is_kept_without_invalidation() {
        let config = MemoryConfig {
            invalidate_on_write: false,
            ..MemoryConfig::default()
        };
        let mut manager = MemoryManager::in_memory(config);
        seeded(&mut manager);
        manager.search("检索", None);

        manager.remove_memory("t1").unwrap();
        let response = manager.search("检索", None);
        assert!(response.cached);
        // The cached payload is a copy; it still holds the removed record.
        assert!(response.results.iter().any(|h| h.id == "t1"));
    }

    #[test]
    fn full_scan_without_index_matches_indexed_search() {
        let mut indexed = MemoryManager::in_memory(MemoryConfig::default());
        let mut scanned = MemoryManager::in_memory(MemoryConfig {
            use_index: false,
            ..MemoryConfig::default()
        });
        for manager in [&mut indexed, &mut scanned] {
            seeded(manager);
            manager
                .add_memory("t3", "康仔使用ChromaDB向量数据库", Map::new())
                .unwrap();
        }

        for query in ["检索", "chromadb", "数字生命", "天气预报"] {
            assert_eq!(
                indexed.search(query, None).results,
                scanned.search(query, None).results,
                "query {query}"
            );
        }
        assert!(!scanned.stats().indexed);
        assert_eq!(scanned.stats().term_count, 0);
    }

    #[test]
    fn duplicate_add_is_rejected_and_upsert_replaces() {
        let mut manager = MemoryManager::in_memory(MemoryConfig::default());
        seeded(&mut manager);

        let err = manager.add_memory("t1", "other", Map::new()).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(_)));

        manager
            .upsert_memory("t1", "Rust memory engine", Map::new())
            .unwrap();
        assert_eq!(manager.get_memory("t1").unwrap().content, "Rust memory engine");
        manager.upsert_memory("t9", "brand new", Map::new()).unwrap();
        assert_eq!(manager.stats().total_documents, 3);
    }

    #[test]
    fn state_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let mut manager = MemoryManager::open(config_in(&tmp));
            seeded(&mut manager);
            manager.search("检索", None);
            manager.flush().unwrap();
        }

        let mut manager = MemoryManager::open(config_in(&tmp));
        let stats = manager.stats();
        assert_eq!(stats.total_documents, 2);
        assert!(stats.term_count > 0);
        assert_eq!(stats.cache.size, 1);

        let response = manager.search("检索", None);
        assert!(response.cached);
        assert_eq!(response.results.len(), 2);
    }

    #[test]
    fn clear_cache_keeps_memories_and_index() {
        let tmp = TempDir::new().unwrap();
        let mut manager = MemoryManager::open(config_in(&tmp));
        seeded(&mut manager);
        manager.search("检索", None);
        let terms = manager.stats().term_count;

        manager.clear_cache().unwrap();

        let stats = manager.stats();
        assert_eq!(stats.cache.size, 0);
        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.term_count, terms);
        assert!(!manager.search("检索", None).cached);
    }

    #[test]
    fn stale_index_postings_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        {
            let mut manager = MemoryManager::open(config.clone());
            seeded(&mut manager);
            manager.add_memory("t3", "记忆检索", Map::new()).unwrap();
        }

        // Drop t3 from the store snapshot behind the index's back.
        let store_path = config.store_path();
        let mut snapshot: Value =
            serde_json::from_str(&std::fs::read_to_string(&store_path).unwrap()).unwrap();
        snapshot["records"]
            .as_array_mut()
            .unwrap()
            .retain(|r| r["id"] != "t3");
        std::fs::write(&store_path, snapshot.to_string()).unwrap();

        let mut manager = MemoryManager::open(config);
        assert!(
            manager
                .store()
                .index()
                .unwrap()
                .posting("检索")
                .unwrap()
                .docs
                .contains("t3")
        );
        let response = manager.search("检索", None);
        let ids: Vec<&str> = response.results.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&"t3"));

        manager.rebuild_index().unwrap();
        assert!(
            !manager
                .store()
                .index()
                .unwrap()
                .posting("检索")
                .unwrap()
                .docs
                .contains("t3")
        );
    }

    #[test]
    fn import_adds_updates_and_removes() {
        let tmp = TempDir::new().unwrap();
        let daily = tmp.path().join("daily");
        std::fs::create_dir_all(daily.join("2026")).unwrap();
        std::fs::write(daily.join("2026-02-10.md"), "今日学习秒级记忆检索").unwrap();
        std::fs::write(daily.join("2026").join("notes.txt"), "Rust memory notes").unwrap();
        std::fs::write(daily.join("empty.md"), "  \n").unwrap();
        std::fs::write(daily.join("image.png"), "not text").unwrap();

        let mut manager = MemoryManager::open(config_in(&tmp));
        let dirs = manager.config().import_dirs.clone();

        let report = manager.import_dirs(&dirs);
        assert_eq!(report.added, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.errors, 0);
        let record = manager.get_memory("daily/2026-02-10").unwrap();
        assert!(record.metadata.contains_key(CONTENT_HASH));
        assert!(manager.get_memory("daily/2026/notes").is_ok());

        let report = manager.import_dirs(&dirs);
        assert_eq!(report.unchanged, 2);
        assert_eq!(report.added, 0);

        std::fs::write(daily.join("2026-02-10.md"), "今日学习向量数据库").unwrap();
        std::fs::remove_file(daily.join("2026").join("notes.txt")).unwrap();
        let report = manager.import_dirs(&dirs);
        assert_eq!(report.updated, 1);
        assert_eq!(report.removed, 1);
        assert!(manager.get_memory("daily/2026/notes").is_err());

        let response = manager.search("向量", None);
        assert_eq!(response.results[0].id, "daily/2026-02-10");
    }

    #[test]
    fn import_removes_memory_of_emptied_file() {
        let tmp = TempDir::new().unwrap();
        let daily = tmp.path().join("daily");
        std::fs::create_dir_all(&daily).unwrap();
        std::fs::write(daily.join("note.md"), "向量数据库笔记").unwrap();

        let mut manager = MemoryManager::open(config_in(&tmp));
        let dirs = manager.config().import_dirs.clone();
        assert_eq!(manager.import_dirs(&dirs).added, 1);

        std::fs::write(daily.join("note.md"), "\n").unwrap();
        let report = manager.import_dirs(&dirs);
        assert_eq!(report.removed, 1);
        assert_eq!(report.skipped, 0);
        assert!(manager.get_memory("daily/note").is_err());
        assert!(manager.search("向量", None).results.is_empty());

        let report = manager.import_dirs(&dirs);
        assert_eq!(report.removed, 0);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn unpersistable_cache_fails_the_write() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        let mut manager = MemoryManager::open(config.clone());
        seeded(&mut manager);
        assert_eq!(manager.search("检索", None).results.len(), 2);

        let cache_dir = config.cache_path().parent().unwrap().to_path_buf();
        std::fs::remove_dir_all(&cache_dir).unwrap();
        std::fs::write(&cache_dir, "").unwrap();

        let err = manager.add_memory("t3", "检索", Map::new()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(manager.get_memory("t3").is_err());
        assert!(matches!(manager.remove_memory("t1"), Err(Error::Io { .. })));
        assert!(manager.get_memory("t1").is_ok());

        std::fs::remove_file(&cache_dir).unwrap();
        manager.add_memory("t3", "检索", Map::new()).unwrap();

        let mut reopened = MemoryManager::open(config);
        let response = reopened.search("检索", None);
        assert!(!response.cached);
        assert_eq!(response.results.len(), 3);
    }

    #[test]
    fn import_skips_missing_dirs() {
        let tmp = TempDir::new().unwrap();
        let mut manager = MemoryManager::open(config_in(&tmp));
        let report = manager.import_dirs(&[tmp.path().join("nowhere")]);
        assert_eq!(report.added + report.errors, 0);
    }

    #[test]
    fn test_query_fingerprint() {
        let key = query_fingerprint("检索", 20);
        assert!(key.starts_with("query:"));
        assert_eq!(key.len(), "query:".len() + 64);
        assert_eq!(key, query_fingerprint(" 检索 ", 20));
        assert_ne!(key, query_fingerprint("检索", 10));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
