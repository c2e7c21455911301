use std::path::PathBuf;

/// Errors surfaced to callers of the memory store.
///
/// Read-side problems (missing or corrupt snapshots, stale index postings) are
/// recovered where they happen and only logged; they never show up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("memory '{0}' already exists")]
    DuplicateId(String),

    #[error("memory '{0}' not found")]
    NotFound(String),

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize snapshot {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
