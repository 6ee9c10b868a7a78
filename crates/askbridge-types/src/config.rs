//! Provider configuration shapes.
//!
//! Deserialized from the persisted `config.toml`. Loaded fresh from storage
//! at the start of every request and never cached across requests, so a
//! config edit takes effect on the next question.

use secrecy::SecretString;
use serde::Deserialize;

/// Per-provider connection settings.
///
/// The API key is required and has no default. Base URL and model are
/// optional; the resolver fills in the provider's well-known endpoint and
/// first supported model when absent.
///
/// The key deserializes into a [`SecretString`] so it never appears in
/// `Debug` output or tracing logs.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub api_key: SecretString,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// The full persisted provider configuration.
///
/// `provider` is the active-provider tag, kept as a raw string: parsing it
/// into a `ProviderType` happens at resolution time, where an unrecognized
/// tag becomes a per-request error rather than making the whole config file
/// unreadable.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfigs {
    pub provider: String,
    #[serde(default)]
    pub gemini: Option<ProviderSettings>,
    #[serde(default)]
    pub openai: Option<ProviderSettings>,
}
