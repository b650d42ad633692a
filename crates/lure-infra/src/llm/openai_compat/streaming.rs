//! Raw SSE body stream for streaming chat completions.
//!
//! The body is forwarded chunk by chunk without interpretation; line
//! framing and delta extraction happen in `lure_core::stream::SseDecoder`.

use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};

use lure_core::llm::ByteStream;
use lure_types::llm::LlmError;

use super::error_for_status;
use super::types::ChatCompletionBody;

/// Open a streaming completion. Connection and status failures become the
/// first (and only) item of the returned stream.
pub fn create_completion_stream(
    client: &reqwest::Client,
    url: &str,
    body: &ChatCompletionBody<'_>,
    api_key: &SecretString,
) -> ByteStream {
    let client = client.clone();
    let url = url.to_string();
    let api_key = api_key.expose_secret().to_string();
    let payload = serde_json::to_vec(body);

    Box::pin(async_stream::stream! {
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                yield Err::<Vec<u8>, LlmError>(LlmError::InvalidRequest(format!("failed to encode request: {e}")));
                return;
            }
        };

        let response = match client
            .post(&url)
            .bearer_auth(&api_key)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream")
            .body(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                yield Err(LlmError::Transport(format!("HTTP request failed: {e}")));
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            yield Err(error_for_status(status.as_u16(), error_body));
            return;
        }

        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => yield Ok(bytes.to_vec()),
                Err(e) => {
                    yield Err(LlmError::Stream(format!("body read failed: {e}")));
                    return;
                }
            }
        }
    })
}
