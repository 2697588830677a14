// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Conventional config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "Assetpipe.toml";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Parse and validate configuration held in a string (tests, embedding).
pub fn parse_str(contents: &str) -> Result<ConfigFile> {
    let raw: RawConfigFile = toml::from_str(contents)?;
    ConfigFile::try_from(raw)
}

/// Resolve the configuration used by the CLI.
///
/// - An explicit path must exist.
/// - Without one, `Assetpipe.toml` is used if present, otherwise defaults.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ConfigFile> {
    match explicit {
        Some(path) => load_and_validate(path),
        None => {
            let path = default_config_path();
            if path.is_file() {
                load_and_validate(&path)
            } else {
                debug!(path = ?path, "no config file found; using defaults");
                Ok(ConfigFile::default())
            }
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}
