//! OpenAI-compatible inference provider.
//!
//! Speaks `POST {base_url}/chat/completions` with a bearer token. Works
//! against OpenAI itself and the gateways that mirror its API.

pub mod streaming;
pub mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use lure_core::llm::{ByteStream, LlmProvider};
use lure_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use self::streaming::create_completion_stream;
use self::types::{ChatCompletionBody, ChatCompletionResponse};

/// Provider for any OpenAI-compatible chat-completions API.
///
/// # API Key Security
///
/// The key is a [`SecretString`] exposed only when setting the
/// `Authorization` header. The type does not implement Debug.
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl OpenAiCompatibleProvider {
    /// Create a provider for `base_url` (without `/chat/completions`).
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest, stream: bool) -> ChatCompletionBody<'a> {
        let model = if request.model.is_empty() {
            self.model.as_str()
        } else {
            request.model.as_str()
        };
        ChatCompletionBody {
            model,
            messages: &request.messages,
            stream,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: request.response_format,
        }
    }
}

/// Map a non-success status to an [`LlmError`].
pub(crate) fn error_for_status(status: u16, body: String) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthenticationFailed,
        402 => LlmError::PaymentRequired,
        429 => LlmError::RateLimited,
        _ => LlmError::Status { status, body },
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.body(request, false);
        let url = self.url("/chat/completions");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "inference request rejected");
            return Err(error_for_status(status.as_u16(), error_body));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        Ok(CompletionResponse {
            id: parsed.id.clone(),
            content: parsed.first_content().to_string(),
            model: parsed.model.clone().unwrap_or_else(|| body.model.to_string()),
        })
    }

    fn stream(&self, request: CompletionRequest) -> ByteStream {
        let body = self.body(&request, true);
        let url = self.url("/chat/completions");
        create_completion_stream(&self.client, &url, &body, &self.api_key)
    }
}
