//! Application state wiring the relay to its concrete collaborators.
//!
//! Core traits are generic; AppState pins them to the infra
//! implementations: TOML configuration storage and the config-file
//! navigator.

use std::path::PathBuf;
use std::sync::Arc;

use askbridge_core::navigate::OptionsNavigator;
use askbridge_infra::navigate::ConfigFileNavigator;
use askbridge_infra::provider::StoredProviderResolver;
use askbridge_infra::store::{TomlConfigStore, resolve_data_dir};

/// Concrete resolver type pinned to the infra implementations.
pub type ConcreteResolver = StoredProviderResolver<TomlConfigStore>;

/// Shared application state for the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ConcreteResolver>,
    pub navigator: Arc<dyn OptionsNavigator>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: ensure the data directory exists
    /// and wire the config store into the resolver.
    pub async fn init(data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(resolve_data_dir);
        tokio::fs::create_dir_all(&data_dir).await?;

        let store = TomlConfigStore::in_dir(&data_dir);
        let navigator = Arc::new(ConfigFileNavigator::new(store.path()));
        let resolver = Arc::new(StoredProviderResolver::new(store));

        Ok(Self {
            resolver,
            navigator,
            data_dir,
        })
    }
}
