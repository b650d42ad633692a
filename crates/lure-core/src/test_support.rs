//! Scripted provider and recording sink shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream;
use tokio::sync::Notify;

use lure_types::error::SinkError;
use lure_types::intelligence::FinalResult;
use lure_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use crate::finalize::EvaluationSink;
use crate::llm::{ByteStream, LlmProvider};

/// One scripted answer.
pub enum Scripted {
    /// Whole reply; streamed as SSE records when requested as a stream.
    Reply(String),
    /// Reply delivered after a delay (single-shot only).
    Delayed(Duration, String),
    Fail(LlmError),
    /// Raw SSE body chunks.
    Sse(Vec<Vec<u8>>),
    /// Streams the text, then fails.
    Interrupted(String, LlmError),
    /// Streams the first delta, waits for the notify, then the second.
    Gated(String, Arc<Notify>, String),
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Scripted>,
    analyses: VecDeque<Scripted>,
    requests: Vec<CompletionRequest>,
}

/// Provider answering from two queues: reply requests and JSON extraction
/// requests (those with a `response_format`).
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    pub fn with_replies(replies: Vec<Scripted>) -> Self {
        Self::new(replies, Vec::new())
    }

    pub fn new(replies: Vec<Scripted>, analyses: Vec<Scripted>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                replies: replies.into(),
                analyses: analyses.into(),
                requests: Vec::new(),
            })),
        }
    }

    pub fn model_name(&self) -> &'static str {
        "scripted-model"
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn analysis_requests(&self) -> Vec<CompletionRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.response_format.is_some())
            .collect()
    }

    /// SSE body for the given deltas, cut into `size`-byte chunks.
    pub fn sse_chunks(deltas: &[&str], size: usize) -> Vec<Vec<u8>> {
        let mut body = String::from(": stream open\n\n");
        for delta in deltas {
            body.push_str(&sse_record(delta));
        }
        body.push_str("data: [DONE]\n\n");
        body.as_bytes().chunks(size).map(<[u8]>::to_vec).collect()
    }

    fn next(&self, request: &CompletionRequest) -> Scripted {
        let mut script = self.script.lock().unwrap();
        script.requests.push(request.clone());
        let queue = if request.response_format.is_some() {
            &mut script.analyses
        } else {
            &mut script.replies
        };
        queue.pop_front().unwrap_or_else(|| {
            Scripted::Fail(LlmError::InvalidRequest("no scripted response".to_string()))
        })
    }
}

fn sse_record(delta: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({"choices": [{"delta": {"content": delta}}]})
    )
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        self.model_name()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let content = match self.next(request) {
            Scripted::Reply(text) => text,
            Scripted::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                text
            }
            Scripted::Fail(e) | Scripted::Interrupted(_, e) => return Err(e),
            Scripted::Sse(_) | Scripted::Gated(..) => {
                return Err(LlmError::InvalidRequest("stream-only script".to_string()));
            }
        };
        Ok(CompletionResponse {
            id: None,
            content,
            model: request.model.clone(),
        })
    }

    fn stream(&self, request: CompletionRequest) -> ByteStream {
        match self.next(&request) {
            Scripted::Reply(text) | Scripted::Delayed(_, text) => {
                let deltas: Vec<&str> = if text.is_empty() { vec![] } else { vec![text.as_str()] };
                let chunks = Self::sse_chunks(&deltas, 5);
                Box::pin(stream::iter(chunks.into_iter().map(Ok::<_, LlmError>)))
            }
            Scripted::Fail(e) => Box::pin(stream::iter(vec![Err::<Vec<u8>, _>(e)])),
            Scripted::Sse(chunks) => Box::pin(stream::iter(chunks.into_iter().map(Ok::<_, LlmError>))),
            Scripted::Interrupted(text, e) => Box::pin(stream::iter(vec![
                Ok(sse_record(&text).into_bytes()),
                Err(e),
            ])),
            Scripted::Gated(first, gate, second) => Box::pin(async_stream::stream! {
                yield Ok::<_, LlmError>(sse_record(&first).into_bytes());
                gate.notified().await;
                yield Ok(sse_record(&second).into_bytes());
                yield Ok(b"data: [DONE]\n".to_vec());
            }),
        }
    }
}

/// Sink that records every payload and answers with a fixed result.
#[derive(Clone)]
pub struct RecordingSink {
    payloads: Arc<Mutex<Vec<FinalResult>>>,
    result: Result<Option<serde_json::Value>, SinkError>,
}

impl RecordingSink {
    pub fn ok() -> Self {
        Self {
            payloads: Arc::default(),
            result: Ok(Some(serde_json::json!({"status": "ok"}))),
        }
    }

    pub fn failing(error: SinkError) -> Self {
        Self {
            payloads: Arc::default(),
            result: Err(error),
        }
    }

    pub fn payloads(&self) -> Vec<FinalResult> {
        self.payloads.lock().unwrap().clone()
    }
}

impl EvaluationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn submit(&self, result: &FinalResult) -> Result<Option<serde_json::Value>, SinkError> {
        self.payloads.lock().unwrap().push(result.clone());
        self.result.clone()
    }
}
