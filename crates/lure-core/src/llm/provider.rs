//! LlmProvider trait definition.
//!
//! This is the core abstraction over the inference service. Uses RPITIT
//! for `complete`, and `Pin<Box<dyn Stream>>` for `stream` (streams need to
//! be object-safe for the BoxLlmProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use lure_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Raw response body of a streaming completion, chunked as it arrives.
///
/// Chunks are not line-aligned and may split multi-byte characters; they
/// are meant to be fed to [`crate::stream::SseDecoder`].
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, LlmError>> + Send + 'static>>;

/// Trait for inference-service backends.
///
/// Implementations live in lure-infra (e.g., `OpenAiCompatibleProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai_compatible").
    fn name(&self) -> &str;

    /// Model used when a request leaves `model` empty.
    fn model(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request and return the raw body.
    ///
    /// Connection and status failures surface as the first item of the
    /// stream rather than as a separate result.
    fn stream(&self, request: CompletionRequest) -> ByteStream;
}
