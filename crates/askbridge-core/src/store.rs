//! Configuration storage and provider resolution capabilities.
//!
//! Both are traits so the relay can be driven with injected fixtures in
//! tests. Concrete implementations (`TomlConfigStore`,
//! `StoredProviderResolver`) live in askbridge-infra.

use askbridge_types::config::ProviderConfigs;
use askbridge_types::error::{ConfigError, ResolveError};

use crate::provider::box_provider::BoxAnswerProvider;

/// Read-only access to the persisted provider configuration.
///
/// Implementations must read fresh state on every call: configuration is
/// loaded at the start of each request and never cached across requests.
/// Concurrent in-flight requests may load without coordination.
pub trait ConfigStore: Send + Sync {
    /// Load the current provider configuration.
    fn load(
        &self,
    ) -> impl std::future::Future<Output = Result<ProviderConfigs, ConfigError>> + Send;
}

/// Resolves the currently configured provider into a ready-to-use instance.
///
/// Each call constructs a fresh provider owned exclusively by the request
/// that asked for it.
pub trait ProviderResolver: Send + Sync {
    /// Resolve the active provider from stored configuration.
    fn resolve(
        &self,
    ) -> impl std::future::Future<Output = Result<BoxAnswerProvider, ResolveError>> + Send;
}
