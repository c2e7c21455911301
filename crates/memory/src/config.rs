use std::{path::PathBuf, time::Duration};

use crate::cache::{self, FlushPolicy};

/// Configuration for the memory subsystem.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Root directory holding the `store/`, `index/` and `cache/` snapshots.
    pub data_dir: PathBuf,
    /// Narrow candidates through the inverted index. Without it every search is a full scan.
    pub use_index: bool,
    /// Result count when the caller does not pass a limit.
    pub default_limit: usize,
    /// Upper bound applied to any requested limit.
    pub max_limit: usize,
    /// Maximum number of cached query results.
    pub cache_capacity: usize,
    /// Age after which a cached result is treated as a miss.
    pub cache_max_age: Duration,
    pub flush_policy: FlushPolicy,
    /// Drop cached results whenever a memory is added, replaced or removed.
    pub invalidate_on_write: bool,
    /// Directories scanned by bulk import.
    pub import_dirs: Vec<PathBuf>,
    /// File extensions (without the dot) picked up by bulk import.
    pub import_extensions: Vec<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("memory"),
            use_index: true,
            default_limit: 20,
            max_limit: 100,
            cache_capacity: cache::DEFAULT_CAPACITY,
            cache_max_age: cache::DEFAULT_MAX_AGE,
            flush_policy: FlushPolicy::EveryWrite,
            invalidate_on_write: true,
            import_dirs: ["daily", "topics", "people"]
                .iter()
                .map(|d| PathBuf::from("memory").join(d))
                .collect(),
            import_extensions: vec!["md".into(), "markdown".into(), "txt".into()],
        }
    }
}

impl MemoryConfig {
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("store").join("memories.json")
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("index").join("keyword-index.json")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join("cache").join("lru-metadata.json")
    }
}
