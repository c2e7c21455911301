//! `fastrecall.toml` layout.

use std::{path::PathBuf, time::Duration};

use {
    fastrecall_memory::{MemoryConfig, cache::FlushPolicy},
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FastRecallConfig {
    /// Root for snapshots and the default import directories.
    pub data_dir: Option<PathBuf>,
    pub search: SearchConfig,
    pub cache: CacheConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub use_index: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let defaults = MemoryConfig::default();
        Self {
            default_limit: defaults.default_limit,
            max_limit: defaults.max_limit,
            use_index: defaults.use_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub capacity: usize,
    pub max_age_secs: u64,
    pub flush: FlushPolicy,
    pub invalidate_on_write: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let defaults = MemoryConfig::default();
        Self {
            capacity: defaults.cache_capacity,
            max_age_secs: defaults.cache_max_age.as_secs(),
            flush: defaults.flush_policy,
            invalidate_on_write: defaults.invalidate_on_write,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    /// Relative entries are resolved against the data directory.
    pub dirs: Vec<PathBuf>,
    pub extensions: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            dirs: ["daily", "topics", "people"].iter().map(PathBuf::from).collect(),
            extensions: MemoryConfig::default().import_extensions,
        }
    }
}

impl FastRecallConfig {
    /// Build the runtime memory configuration rooted at `data_dir`.
    pub fn to_memory_config(&self, data_dir: PathBuf) -> MemoryConfig {
        let import_dirs = self
            .import
            .dirs
            .iter()
            .map(|d| {
                if d.is_absolute() {
                    d.clone()
                } else {
                    data_dir.join(d)
                }
            })
            .collect();
        let import_extensions = self
            .import
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_string())
            .collect();

        MemoryConfig {
            data_dir,
            use_index: self.search.use_index,
            default_limit: self.search.default_limit,
            max_limit: self.search.max_limit,
            cache_capacity: self.cache.capacity,
            cache_max_age: Duration::from_secs(self.cache.max_age_secs),
            flush_policy: self.cache.flush,
            invalidate_on_write: self.cache.invalidate_on_write,
            import_dirs,
            import_extensions,
        }
    }
}
