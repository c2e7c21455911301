//! Size-bounded, age-limited LRU cache for query results.
//!
//! Eviction scans for the entry with the oldest `last_accessed` (ties go to
//! the lowest access tick), which is linear in the cache size and fine at the
//! capacities this cache is configured with.

use std::{
    collections::HashMap,
    path::PathBuf,
    time::Duration,
};

use {
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    tracing::debug,
};

use crate::{
    error::Result,
    snapshot::{self, SNAPSHOT_VERSION, now_ms},
};

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// When cache mutations reach disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// Persist after every `set`, `delete` and `clear`.
    #[default]
    EveryWrite,
    /// Persist only when [`LruCache::flush`] is called.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    /// Milliseconds since the Unix epoch; set once on insert.
    pub created_at: u64,
    pub last_accessed: u64,
    pub access_count: u64,
    /// Logical access tick, breaks `last_accessed` ties.
    #[serde(default)]
    pub access_seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotOut<'a, V: Serialize> {
    version: u32,
    last_save: u64,
    hits: u64,
    misses: u64,
    entries: Vec<&'a CacheEntry<V>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotIn<V> {
    #[serde(default)]
    hits: u64,
    #[serde(default)]
    misses: u64,
    entries: Vec<CacheEntry<V>>,
}

pub struct LruCache<V> {
    path: Option<PathBuf>,
    capacity: usize,
    max_age: Duration,
    flush_policy: FlushPolicy,
    entries: HashMap<String, CacheEntry<V>>,
    tick: u64,
    hits: u64,
    misses: u64,
    dirty: bool,
}

impl<V> LruCache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// A cache that is never written to disk.
    pub fn in_memory(capacity: usize, max_age: Duration) -> Self {
        Self {
            path: None,
            capacity: capacity.max(1),
            max_age,
            flush_policy: FlushPolicy::Manual,
            entries: HashMap::new(),
            tick: 0,
            hits: 0,
            misses: 0,
            dirty: false,
        }
    }

    /// Load the cache snapshot at `path`. Missing or corrupt files give an empty cache.
    pub fn load(
        path: impl Into<PathBuf>,
        capacity: usize,
        max_age: Duration,
        flush_policy: FlushPolicy,
    ) -> Self {
        let path = path.into();
        let mut cache = Self::in_memory(capacity, max_age);
        cache.flush_policy = flush_policy;

        if let Some(snap) = snapshot::load::<SnapshotIn<V>>(&path, "cache") {
            cache.hits = snap.hits;
            cache.misses = snap.misses;
            for entry in snap.entries {
                cache.tick = cache.tick.max(entry.access_seq);
                cache.entries.insert(entry.key.clone(), entry);
            }
            // A smaller configured capacity than the one the snapshot was written with.
            while cache.entries.len() > cache.capacity {
                cache.evict_oldest();
            }
        }
        debug!(path = %path.display(), entries = cache.entries.len(), "loaded result cache");
        cache.path = Some(path);
        cache
    }

    /// Look up `key`. Expired entries count as a miss and are evicted.
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, now_ms())
    }

    pub fn get_at(&mut self, key: &str, now: u64) -> Option<V> {
        self.dirty = true;
        let Some(created_at) = self.entries.get(key).map(|e| e.created_at) else {
            self.misses += 1;
            return None;
        };
        if now.saturating_sub(created_at) > self.max_age_ms() {
            self.entries.remove(key);
            self.misses += 1;
            debug!(key, "cache entry expired");
            return None;
        }

        self.tick += 1;
        let tick = self.tick;
        let entry = self.entries.get_mut(key)?;
        entry.last_accessed = now;
        entry.access_count += 1;
        entry.access_seq = tick;
        self.hits += 1;
        Some(entry.value.clone())
    }

    /// Insert or refresh `key`, evicting the least recently used entry when full.
    pub fn set(&mut self, key: impl Into<String>, value: V) -> Result<()> {
        self.set_at(key, value, now_ms())
    }

    pub fn set_at(&mut self, key: impl Into<String>, value: V, now: u64) -> Result<()> {
        let key = key.into();
        self.tick += 1;
        let tick = self.tick;

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            entry.last_accessed = now;
            entry.access_count += 1;
            entry.access_seq = tick;
        } else {
            if self.entries.len() >= self.capacity {
                self.evict_oldest();
            }
            self.entries.insert(key.clone(), CacheEntry {
                key,
                value,
                created_at: now,
                last_accessed: now,
                access_count: 0,
                access_seq: tick,
            });
        }

        self.dirty = true;
        self.write_through()
    }

    /// Remove `key`. Returns whether it was present.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.dirty = true;
            self.write_through()?;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.dirty = true;
        self.write_through()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entry(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        CacheStats {
            size: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits,
            misses: self.misses,
            hit_rate: if lookups > 0 {
                self.hits as f64 / lookups as f64
            } else {
                0.0
            },
        }
    }

    /// Write pending changes (including access bookkeeping) to disk.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.save()?;
        self.dirty = false;
        Ok(())
    }

    fn write_through(&mut self) -> Result<()> {
        match self.flush_policy {
            FlushPolicy::EveryWrite => self.flush(),
            FlushPolicy::Manual => Ok(()),
        }
    }

    fn save(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let mut entries: Vec<&CacheEntry<V>> = self.entries.values().collect();
        entries.sort_by_key(|e| e.access_seq);
        snapshot::save(path, &SnapshotOut {
            version: SNAPSHOT_VERSION,
            last_save: now_ms(),
            hits: self.hits,
            misses: self.misses,
            entries,
        })
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .values()
            .min_by_key(|e| (e.last_accessed, e.access_seq))
            .map(|e| e.key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            debug!(key = %key, "evicted least recently used cache entry");
        }
    }

    fn max_age_ms(&self) -> u64 {
        self.max_age.as_millis() as u64
    }
}
