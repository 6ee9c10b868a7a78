//! OpenAiProvider -- concrete [`AnswerProvider`] for OpenAI-compatible APIs.
//!
//! Uses [`async_openai`] for type-safe request handling and built-in SSE
//! streaming of chat completions. Any endpoint speaking the OpenAI wire
//! protocol works through the configurable base URL.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use askbridge_core::provider::{AnswerProvider, AnswerStream, Generation};
use askbridge_types::channel::AnswerEvent;
use askbridge_types::error::ProviderError;

/// OpenAI chat-completions answer provider.
///
/// # API Key Security
///
/// Does NOT derive Debug to prevent accidental exposure of the API key
/// stored inside the `async_openai::Client`. Same defense-in-depth pattern
/// as [`super::gemini::GeminiProvider`].
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    /// The well-known OpenAI endpoint, used when no base URL is stored.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    /// Supported models, default first.
    pub const SUPPORTED_MODELS: &'static [&'static str] =
        &["gpt-4o-mini", "gpt-4o", "gpt-3.5-turbo"];

    /// Create a new OpenAI provider.
    pub fn new(api_key: SecretString, base_url: String, model: String) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key.expose_secret())
            .with_api_base(&base_url);

        Self {
            client: Client::with_config(config),
            base_url,
            model,
        }
    }

    /// The base URL this instance was resolved with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(&self, prompt: &str) -> CreateChatCompletionRequest {
        CreateChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                    name: None,
                },
            )],
            stream: Some(true),
            ..Default::default()
        }
    }
}

impl AnswerProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_answer(
        &self,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<Generation, ProviderError> {
        let request = self.build_request(prompt);

        let mut chunks = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(map_openai_error)?;

        let stream_cancel = cancel.clone();

        let events: AnswerStream = Box::pin(async_stream::try_stream! {
            let mut answer = String::new();
            loop {
                let next = tokio::select! {
                    _ = stream_cancel.cancelled() => break,
                    next = chunks.next() => next,
                };
                let Some(result) = next else { break };
                let chunk = result.map_err(map_openai_error)?;

                let mut grew = false;
                for choice in &chunk.choices {
                    if let Some(content) = &choice.delta.content {
                        if !content.is_empty() {
                            answer.push_str(content);
                            grew = true;
                        }
                    }
                }
                if grew {
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

/// Map an `async_openai::error::OpenAIError` to a [`ProviderError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> ProviderError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let error_type = api_err.r#type.as_deref().unwrap_or("");
            if error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
                || api_err.message.contains("Invalid API key")
            {
                ProviderError::AuthenticationFailed
            } else {
                ProviderError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => {
            if reqwest_err.status().is_some_and(|s| s.as_u16() == 401) {
                ProviderError::AuthenticationFailed
            } else {
                ProviderError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::JSONDeserialize(_, content) => {
            ProviderError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::StreamError(stream_err) => ProviderError::Stream(stream_err.to_string()),
        _ => ProviderError::Provider {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(
            SecretString::from("sk-test-not-real".to_string()),
            OpenAiProvider::DEFAULT_BASE_URL.to_string(),
            "gpt-4o-mini".to_string(),
        )
    }

    #[test]
    fn test_build_request_shape() {
        let request = provider().build_request("why is the sky blue?");
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.stream, Some(true));
    }

    #[test]
    fn test_accessors() {
        let p = provider();
        assert_eq!(p.name(), "openai");
        assert_eq!(p.model(), "gpt-4o-mini");
        assert_eq!(p.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_map_openai_error_auth() {
        use async_openai::error::{ApiError, OpenAIError};
        let api_err = ApiError {
            message: "Incorrect API key provided".to_string(),
            r#type: Some("authentication_error".to_string()),
            param: None,
            code: None,
        };
        let err = map_openai_error(OpenAIError::ApiError(api_err));
        assert!(matches!(err, ProviderError::AuthenticationFailed));
    }

    #[test]
    fn test_map_openai_error_stream() {
        use async_openai::error::{OpenAIError, StreamError};
        let err = map_openai_error(OpenAIError::StreamError(Box::new(
            StreamError::EventStream("connection reset".to_string()),
        )));
        assert!(matches!(err, ProviderError::Stream(_)));
    }

    #[test]
    fn test_supported_models_has_a_default() {
        assert!(!OpenAiProvider::SUPPORTED_MODELS.is_empty());
    }
}
