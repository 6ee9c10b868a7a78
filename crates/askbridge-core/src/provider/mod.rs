//! AnswerProvider trait definition.
//!
//! This is the single capability the relay requires from an LLM backend.
//! Uses RPITIT for `generate_answer` and `Pin<Box<dyn Stream>>` for the
//! event stream (streams need to be object-safe for the BoxAnswerProvider
//! wrapper).

pub mod box_provider;

use std::pin::Pin;

use futures_util::Stream;
use tokio_util::sync::CancellationToken;

use askbridge_types::channel::AnswerEvent;
use askbridge_types::error::ProviderError;

/// A lazy, finite, non-restartable sequence of provider events.
///
/// Emits zero or more [`AnswerEvent::Data`] items followed by exactly one
/// [`AnswerEvent::Done`], in emission order.
pub type AnswerStream =
    Pin<Box<dyn Stream<Item = Result<AnswerEvent, ProviderError>> + Send + 'static>>;

/// Release hook returned by a provider for early teardown.
///
/// Invoked at most once, by the relay, when the caller disconnects before
/// the stream settles.
pub type ReleaseFn = Box<dyn FnOnce() + Send + 'static>;

/// An in-flight answer generation.
pub struct Generation {
    /// The event stream for this request.
    pub events: AnswerStream,
    /// Optional early-teardown hook. Dropping `events` also releases the
    /// underlying connection; this hook exists for the disconnect path,
    /// which may fire while the stream is still being consumed elsewhere.
    pub release: Option<ReleaseFn>,
}

/// Trait for LLM answer backends (Gemini, OpenAI, etc.).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). The event
/// stream is boxed because it must be object-safe for [`box_provider::BoxAnswerProvider`].
///
/// Implementations live in askbridge-infra (e.g., `GeminiProvider`) and are
/// constructed per request by the resolver; instances are never reused
/// across requests.
pub trait AnswerProvider: Send + Sync {
    /// Human-readable provider name (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// The model this provider instance was resolved with.
    fn model(&self) -> &str;

    /// Start generating an answer for `prompt`.
    ///
    /// The provider must honor `cancel` cooperatively: once the token is
    /// cancelled it stops emitting and winds down its own network work.
    /// The relay never forcibly kills an outstanding operation.
    fn generate_answer(
        &self,
        prompt: &str,
        cancel: CancellationToken,
    ) -> impl std::future::Future<Output = Result<Generation, ProviderError>> + Send;
}
