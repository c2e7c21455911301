use std::path::{Path, PathBuf};

use {
    directories::ProjectDirs,
    fastrecall_memory::MemoryConfig,
    tracing::{debug, warn},
};

use crate::{
    error::ConfigError,
    schema::FastRecallConfig,
    validate::{Severity, validate},
};

pub const CONFIG_FILE_NAME: &str = "fastrecall.toml";

/// A parsed config together with the file it came from, if any.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: FastRecallConfig,
    pub source: Option<PathBuf>,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "fastrecall", "fastrecall")
}

/// Platform config directory (e.g. `~/.config/fastrecall`).
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().to_path_buf())
}

/// Platform data directory, or `./memory` when the platform has none.
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("memory"))
}

/// Look for `fastrecall.toml` in the working directory, then the config directory.
pub fn discover() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    config_dir()
        .map(|d| d.join(CONFIG_FILE_NAME))
        .filter(|p| p.is_file())
}

/// Load `explicit`, or the discovered config file, or defaults when there is none.
///
/// An explicit path that cannot be read is an error; a missing discovered
/// file is not.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let source = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => discover(),
    };
    let Some(path) = source else {
        debug!("no config file found, using defaults");
        return Ok(LoadedConfig::default());
    };

    let config = load_file(&path)?;
    Ok(LoadedConfig {
        config,
        source: Some(path),
    })
}

/// Parse and validate a single config file. Warnings are logged, errors returned.
pub fn load_file(path: &Path) -> Result<FastRecallConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: FastRecallConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut errors = Vec::new();
    for diag in validate(&config) {
        match diag.severity {
            Severity::Error => errors.push(diag.to_string()),
            Severity::Warning => warn!(path = %path.display(), "config: {diag}"),
        }
    }
    if !errors.is_empty() {
        return Err(ConfigError::Invalid(errors));
    }

    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

impl LoadedConfig {
    /// Data directory: `override_dir`, then `data_dir` from the file (relative
    /// to the file's directory), then the platform default.
    pub fn resolve_data_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        if let Some(dir) = override_dir {
            return dir.to_path_buf();
        }
        match (&self.config.data_dir, &self.source) {
            (Some(dir), Some(source)) if dir.is_relative() => source
                .parent()
                .map(|parent| parent.join(dir))
                .unwrap_or_else(|| dir.clone()),
            (Some(dir), _) => dir.clone(),
            (None, _) => data_dir(),
        }
    }

    pub fn memory_config(&self, override_dir: Option<&Path>) -> MemoryConfig {
        self.config
            .to_memory_config(self.resolve_data_dir(override_dir))
    }
}
