//! Stub provider and sink for the HTTP and CLI tests.

use std::sync::{Arc, Mutex};

use futures_util::stream;

use lure_core::finalize::EvaluationSink;
use lure_core::llm::{ByteStream, LlmProvider};
use lure_types::error::SinkError;
use lure_types::intelligence::FinalResult;
use lure_types::llm::{CompletionRequest, CompletionResponse, LlmError};

pub const SCAM_ANALYSIS: &str = r#"{
    "isScam": true,
    "scamType": "bank impersonation",
    "threatLevel": "high",
    "confidence": 90,
    "extractedData": {"bankAccounts": ["50100234567891"], "upiIds": [], "phishingLinks": [],
                      "phoneNumbers": [], "suspiciousKeywords": ["blocked", "urgent"]},
    "indicators": ["urgency"],
    "summary": "Bank impersonation asking for account details."
}"#;

/// Answers every reply request with `reply` (or `fail`) and every
/// extraction request with `analysis`.
#[derive(Clone)]
pub struct StubProvider {
    reply: String,
    analysis: String,
    fail: Option<LlmError>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl StubProvider {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            analysis: SCAM_ANALYSIS.to_string(),
            fail: None,
            requests: Arc::default(),
        }
    }

    pub fn failing(error: LlmError) -> Self {
        Self {
            fail: Some(error),
            ..Self::new("")
        }
    }

    pub fn reply_requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.response_format.is_none())
            .cloned()
            .collect()
    }

    fn answer(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if request.response_format.is_some() {
            return Ok(self.analysis.clone());
        }
        match &self.fail {
            Some(e) => Err(e.clone()),
            None => Ok(self.reply.clone()),
        }
    }
}

impl LlmProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-model"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            id: None,
            content: self.answer(request)?,
            model: "stub-model".to_string(),
        })
    }

    fn stream(&self, request: CompletionRequest) -> ByteStream {
        match self.answer(&request) {
            Ok(text) => {
                let body = format!(
                    "data: {}\n\ndata: [DONE]\n\n",
                    serde_json::json!({"choices": [{"delta": {"content": text}}]})
                );
                Box::pin(stream::iter(vec![Ok::<_, LlmError>(body.into_bytes())]))
            }
            Err(e) => Box::pin(stream::iter(vec![Err::<Vec<u8>, _>(e)])),
        }
    }
}

#[derive(Clone, Default)]
pub struct StubSink {
    payloads: Arc<Mutex<Vec<FinalResult>>>,
}

impl StubSink {
    pub fn payloads(&self) -> Vec<FinalResult> {
        self.payloads.lock().unwrap().clone()
    }
}

impl EvaluationSink for StubSink {
    fn name(&self) -> &str {
        "stub"
    }

    async fn submit(&self, result: &FinalResult) -> Result<Option<serde_json::Value>, SinkError> {
        self.payloads.lock().unwrap().push(result.clone());
        Ok(Some(serde_json::json!({"status": "received"})))
    }
}
