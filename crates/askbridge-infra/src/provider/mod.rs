//! Provider resolution.
//!
//! Maps the stored active-provider tag onto a concrete [`AnswerProvider`],
//! filling in each provider's well-known endpoint and first supported model
//! when the stored settings omit them. The match over [`ProviderType`] is
//! exhaustive, so adding a provider variant is a compile-time-checked
//! decision. An unrecognized tag fails the request with an error naming it;
//! no fallback provider is attempted.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use askbridge_core::provider::box_provider::BoxAnswerProvider;
use askbridge_core::store::{ConfigStore, ProviderResolver};
use askbridge_types::config::{ProviderConfigs, ProviderSettings};
use askbridge_types::error::ResolveError;
use askbridge_types::provider::ProviderType;

/// Resolve base URL and model from stored settings, defaulting absent
/// fields. An explicitly supplied value always wins.
fn settings_or_defaults(
    settings: &ProviderSettings,
    default_base_url: &str,
    default_model: &str,
) -> (String, String) {
    let base_url = settings
        .base_url
        .clone()
        .unwrap_or_else(|| default_base_url.to_string());
    let model = settings
        .model
        .clone()
        .unwrap_or_else(|| default_model.to_string());
    (base_url, model)
}

/// Construct the configured provider from a loaded configuration.
pub fn build_provider(configs: &ProviderConfigs) -> Result<BoxAnswerProvider, ResolveError> {
    let tag: ProviderType = configs
        .provider
        .parse()
        .map_err(|_| ResolveError::UnknownProvider(configs.provider.clone()))?;

    match tag {
        ProviderType::Gemini => {
            let settings = configs
                .gemini
                .as_ref()
                .ok_or(ResolveError::MissingSettings(ProviderType::Gemini))?;
            let (base_url, model) = settings_or_defaults(
                settings,
                GeminiProvider::DEFAULT_BASE_URL,
                GeminiProvider::SUPPORTED_MODELS[0],
            );
            Ok(BoxAnswerProvider::new(GeminiProvider::new(
                settings.api_key.clone(),
                base_url,
                model,
            )))
        }
        ProviderType::OpenAi => {
            let settings = configs
                .openai
                .as_ref()
                .ok_or(ResolveError::MissingSettings(ProviderType::OpenAi))?;
            let (base_url, model) = settings_or_defaults(
                settings,
                OpenAiProvider::DEFAULT_BASE_URL,
                OpenAiProvider::SUPPORTED_MODELS[0],
            );
            Ok(BoxAnswerProvider::new(OpenAiProvider::new(
                settings.api_key.clone(),
                base_url,
                model,
            )))
        }
    }
}

/// [`ProviderResolver`] backed by a [`ConfigStore`].
///
/// Each resolve loads the configuration fresh from the store and constructs
/// a new provider instance owned by that request alone.
pub struct StoredProviderResolver<S> {
    store: S,
}

impl<S> StoredProviderResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: ConfigStore> ProviderResolver for StoredProviderResolver<S> {
    async fn resolve(&self) -> Result<BoxAnswerProvider, ResolveError> {
        let configs = self.store.load().await?;
        build_provider(&configs)
    }
}
