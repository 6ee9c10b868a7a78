//! BoxAnswerProvider -- object-safe dynamic dispatch wrapper for AnswerProvider.
//!
//! 1. Define an object-safe `AnswerProviderDyn` trait with a boxed future
//! 2. Blanket-impl `AnswerProviderDyn` for all `T: AnswerProvider`
//! 3. `BoxAnswerProvider` wraps `Box<dyn AnswerProviderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use askbridge_types::error::ProviderError;

use super::{AnswerProvider, Generation};

/// Object-safe version of [`AnswerProvider`] with a boxed future.
///
/// Exists solely to enable dynamic dispatch (`dyn AnswerProviderDyn`).
/// A blanket implementation is provided for all types implementing
/// `AnswerProvider`.
pub trait AnswerProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    fn generate_answer_boxed<'a>(
        &'a self,
        prompt: &'a str,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<Generation, ProviderError>> + Send + 'a>>;
}

/// Blanket implementation: any `AnswerProvider` automatically implements
/// `AnswerProviderDyn`.
impl<T: AnswerProvider> AnswerProviderDyn for T {
    fn name(&self) -> &str {
        AnswerProvider::name(self)
    }

    fn model(&self) -> &str {
        AnswerProvider::model(self)
    }

    fn generate_answer_boxed<'a>(
        &'a self,
        prompt: &'a str,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<Generation, ProviderError>> + Send + 'a>> {
        Box::pin(self.generate_answer(prompt, cancel))
    }
}

/// Type-erased answer provider for runtime provider selection.
///
/// Since `AnswerProvider` uses RPITIT, it cannot be used as a trait object
/// directly. `BoxAnswerProvider` provides equivalent methods that delegate
/// to the inner `AnswerProviderDyn` trait object.
pub struct BoxAnswerProvider {
    inner: Box<dyn AnswerProviderDyn + Send + Sync>,
}

impl BoxAnswerProvider {
    /// Wrap a concrete `AnswerProvider` in a type-erased box.
    pub fn new<T: AnswerProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    /// Human-readable provider name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// The model this provider instance was resolved with.
    pub fn model(&self) -> &str {
        self.inner.model()
    }

    /// Start generating an answer for `prompt`.
    pub async fn generate_answer(
        &self,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<Generation, ProviderError> {
        self.inner.generate_answer_boxed(prompt, cancel).await
    }
}
