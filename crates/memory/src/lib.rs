//! Memory recall: text → keyword tokens → inverted index → Jaccard ranking,
//! with an LRU result cache in front and JSON snapshots on disk.

pub mod cache;
pub mod config;
pub mod error;
pub mod index;
pub mod manager;
pub mod search;
pub mod similarity;
mod snapshot;
pub mod store;
pub mod tokenizer;

pub use {
    config::MemoryConfig,
    error::{Error, Result},
    manager::{ImportReport, MemoryManager, MemoryStats},
    search::{SearchHit, SearchResponse},
    store::MemoryRecord,
};
