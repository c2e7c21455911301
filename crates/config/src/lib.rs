//! Configuration loading: `fastrecall.toml` discovery, parsing, validation and
//! data directory resolution.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::ConfigError,
    loader::{LoadedConfig, config_dir, data_dir, load_config},
    schema::FastRecallConfig,
};
