//! GeminiProvider -- concrete [`AnswerProvider`] for the Google Gemini API.
//!
//! Sends a `streamGenerateContent` request with `alt=sse` and decodes the
//! SSE response with `eventsource-stream`. Each chunk's candidate text is
//! appended to a running answer, and the accumulated text is emitted as the
//! data payload `{"text": ...}` so the consuming surface can render the
//! answer-so-far without reassembling deltas.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use askbridge_core::provider::{AnswerProvider, AnswerStream, Generation};
use askbridge_types::channel::AnswerEvent;
use askbridge_types::error::ProviderError;

/// Google Gemini answer provider.
///
/// # API Key Security
///
/// Does NOT derive Debug to prevent accidental exposure of the API key.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// The well-known Gemini API endpoint, used when no base URL is stored.
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

    /// Supported models, most capable default first.
    pub const SUPPORTED_MODELS: &'static [&'static str] =
        &["gemini-2.0-flash", "gemini-1.5-pro", "gemini-1.5-flash"];

    /// Create a new Gemini provider.
    pub fn new(api_key: SecretString, base_url: String, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300)) // 5 min timeout for long generations
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url,
            model,
        }
    }

    /// The base URL this instance was resolved with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl AnswerProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_answer(
        &self,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<Generation, ProviderError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::Provider {
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::AuthenticationFailed,
                _ => ProviderError::Provider {
                    message: format!("gemini returned {status}: {detail}"),
                },
            });
        }

        let mut chunks = response.bytes_stream().eventsource();
        let stream_cancel = cancel.clone();

        let events: AnswerStream = Box::pin(async_stream::try_stream! {
            let mut answer = String::new();
            loop {
                let next = tokio::select! {
                    _ = stream_cancel.cancelled() => break,
                    next = chunks.next() => next,
                };
                let Some(result) = next else { break };
                let event = result.map_err(|err| ProviderError::Stream(err.to_string()))?;
                let chunk: Value = serde_json::from_str(&event.data)
                    .map_err(|err| ProviderError::Deserialization(err.to_string()))?;
                if let Some(text) = chunk_text(&chunk) {
                    answer.push_str(&text);
                    yield AnswerEvent::Data(json!({ "text": answer.clone() }));
                }
            }
            if !stream_cancel.is_cancelled() {
                yield AnswerEvent::Done;
            }
        });

        // Early teardown flips the token; the stream loop above observes it
        // and stops consuming, which drops the SSE connection.
        let release = Box::new(move || cancel.cancel());
        Ok(Generation {
            events,
            release: Some(release),
        })
    }
}

/// Extract the candidate text from one streamed Gemini chunk.
fn chunk_text(chunk: &Value) -> Option<String> {
    let parts = chunk
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let mut text = String::new();
    for part in parts {
        if let Some(t) = part.get("text").and_then(Value::as_str) {
            text.push_str(t);
        }
    }
    (!text.is_empty()).then_some(text)
}
