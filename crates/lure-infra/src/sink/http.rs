//! HTTP evaluation sink.
//!
//! POSTs the final-result payload as JSON to the configured callback URL.

use std::time::Duration;

use lure_core::finalize::EvaluationSink;
use lure_types::config::EvaluationSettings;
use lure_types::error::SinkError;
use lure_types::intelligence::FinalResult;

/// Posts final results to the evaluation callback.
#[derive(Debug, Clone)]
pub struct HttpEvaluationSink {
    client: reqwest::Client,
    url: String,
}

impl HttpEvaluationSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_settings(settings: &EvaluationSettings) -> Result<Self, SinkError> {
        Self::new(
            settings.callback_url.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl EvaluationSink for HttpEvaluationSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn submit(&self, result: &FinalResult) -> Result<Option<serde_json::Value>, SinkError> {
        let response = self
            .client
            .post(&self.url)
            .json(result)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), url = %self.url, "evaluation callback rejected result");
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(None);
        }
        // Callback bodies are informational; plain text is kept as a string.
        Ok(Some(
            serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{Canned, TestServer};
    use lure_types::intelligence::{CategorySet, ExtractedIntelligence};

    fn result() -> FinalResult {
        let mut data = ExtractedIntelligence::empty(&CategorySet::submission());
        data.insert("upiIds", vec!["winner@upi".to_string()]);
        FinalResult {
            session_id: "session-1".into(),
            scam_detected: true,
            total_messages_exchanged: 4,
            extracted_intelligence: data,
            agent_notes: "Lottery scam.".to_string(),
        }
    }

    fn sink(url: String) -> HttpEvaluationSink {
        HttpEvaluationSink::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn posts_payload_and_returns_json_body() {
        let server = TestServer::start(Canned::json(200, r#"{"status":"received"}"#)).await;
        let body = sink(server.url("/final")).submit(&result()).await.unwrap();
        assert_eq!(body, Some(serde_json::json!({"status": "received"})));

        let seen = server.requests();
        assert_eq!(seen[0].path, "/final");
        assert_eq!(seen[0].body["sessionId"], "session-1");
        assert_eq!(seen[0].body["scamDetected"], true);
        assert_eq!(seen[0].body["totalMessagesExchanged"], 4);
        assert_eq!(seen[0].body["extractedIntelligence"]["upiIds"][0], "winner@upi");
    }

    #[tokio::test]
    async fn non_json_and_empty_bodies_are_accepted() {
        let server = TestServer::start(Canned::text(200, "OK")).await;
        let body = sink(server.url("/final")).submit(&result()).await.unwrap();
        assert_eq!(body, Some(serde_json::Value::String("OK".to_string())));

        let server = TestServer::start(Canned::text(200, "")).await;
        let body = sink(server.url("/final")).submit(&result()).await.unwrap();
        assert_eq!(body, None);
    }

    #[tokio::test]
    async fn rejection_carries_status_and_body() {
        let server = TestServer::start(Canned::text(503, "maintenance")).await;
        let err = sink(server.url("/final")).submit(&result()).await.unwrap_err();
        assert!(matches!(
            err,
            SinkError::Status { status: 503, ref body } if body == "maintenance"
        ));
    }

    #[tokio::test]
    async fn unreachable_callback_is_transport_error() {
        let err = sink("http://127.0.0.1:9/final".to_string())
            .submit(&result())
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Transport(_)));
    }
}
