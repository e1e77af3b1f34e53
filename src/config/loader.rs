// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{RawRuntimeConfig, RuntimeConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// [`RawRuntimeConfig`].
///
/// This only performs TOML deserialization; it does **not** perform
/// semantic validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawRuntimeConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawRuntimeConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point for embedders:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks:
///   - `max_tree_depth` sanity,
///   - that a configured log level is a known level name.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let raw = load_from_path(&path)?;
    let config = RuntimeConfig::try_from(raw)?;
    Ok(config)
}

/// Helper to resolve a default config path.
///
/// Currently this just returns `Jobtree.toml` in the current working
/// directory; it exists so embedders can later layer env-var or
/// project-local discovery on top.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Jobtree.toml")
}
