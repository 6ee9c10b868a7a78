//! TOML-backed configuration storage.
//!
//! Reads `config.toml` from the data directory (`~/.askbridge/` in
//! production). The file is read and parsed on every load -- configuration
//! is per-request state and is never cached, so an edit takes effect on the
//! next question. Unlike a config file with sensible fallbacks, provider
//! settings have no usable default (there is no API key to invent), so read
//! and parse failures are errors that propagate to the caller.

use std::path::{Path, PathBuf};

use askbridge_core::store::ConfigStore;
use askbridge_types::config::ProviderConfigs;
use askbridge_types::error::ConfigError;

/// Resolve the data directory.
///
/// `ASKBRIDGE_DATA_DIR` overrides; otherwise `~/.askbridge`. Falls back to
/// a relative `.askbridge` when no home directory can be determined
/// (containers, stripped-down CI).
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ASKBRIDGE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".askbridge"),
        None => PathBuf::from(".askbridge"),
    }
}

/// Provider configuration store backed by a TOML file.
pub struct TomlConfigStore {
    path: PathBuf,
}

impl TomlConfigStore {
    /// Create a store reading from the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store reading `config.toml` under the given data directory.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("config.toml"))
    }

    /// The file this store reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for TomlConfigStore {
    async fn load(&self) -> Result<ProviderConfigs, ConfigError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|err| {
            ConfigError::Storage(format!("{}: {err}", self.path.display()))
        })?;

        toml::from_str(&content).map_err(|err| ConfigError::Parse(err.to_string()))
    }
}
