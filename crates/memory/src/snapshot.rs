//! Whole-file JSON snapshots shared by the store, the index and the cache.

use std::{io::ErrorKind, path::Path};

use {
    serde::{Serialize, de::DeserializeOwned},
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

/// Current on-disk format version for every snapshot kind.
pub(crate) const SNAPSHOT_VERSION: u32 = 1;

/// Load a snapshot, or `None` when the file is missing or unparsable.
///
/// Callers start from an empty structure on `None`.
pub(crate) fn load<T: DeserializeOwned>(path: &Path, kind: &str) -> Option<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), kind, "no snapshot on disk, starting empty");
            return None;
        },
        Err(e) => {
            warn!(path = %path.display(), kind, error = %e, "unreadable snapshot, starting empty");
            return None;
        },
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), kind, error = %e, "corrupt snapshot, starting empty");
            None
        },
    }
}

/// Serialize `value` and replace the file at `path` with it.
pub(crate) fn save<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|source| Error::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|e| Error::io(path, e))?;
    Ok(())
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
