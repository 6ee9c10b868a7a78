use thiserror::Error;

use crate::provider::ProviderType;

/// Errors from provider invocation and streaming.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("authentication failed")]
    AuthenticationFailed,
}

/// Errors from configuration storage.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config storage unavailable: {0}")]
    Storage(String),

    #[error("malformed config: {0}")]
    Parse(String),
}

/// Errors from resolving the active provider.
///
/// All fatal for the current request: no fallback provider is attempted
/// and nothing is retried.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("provider '{0}' has no stored configuration")]
    MissingSettings(ProviderType),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
