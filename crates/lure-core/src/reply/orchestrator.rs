//! Turns one inbound utterance into a persona reply.
//!
//! The orchestrator appends the utterance, builds the request from the
//! updated log, dispatches it in the configured [`ReplyMode`], and writes the
//! reply back through the [`MessageAssembler`](crate::session::MessageAssembler).
//! Failures end the turn with one apologetic assistant message; they are
//! never returned to the caller as errors.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use lure_types::chat::{ChatMessage, MessageRole, SessionId};
use lure_types::config::ReplyMode;
use lure_types::llm::{CompletionRequest, LlmError, Message};

use crate::llm::BoxLlmProvider;
use crate::session::{PendingExtraction, Session};
use crate::stream::decode_stream;

/// Assistant message appended when a turn fails.
pub const REPLY_ERROR_MESSAGE: &str = "I apologize, but I encountered an error. Please try again.";

/// Assistant message appended when the service answered with no text.
pub const EMPTY_REPLY_FALLBACK: &str = "I apologize, but I could not process that request.";

/// How one call to [`ReplyOrchestrator::run_turn`] ended.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The persona replied; the reply is the last message of the log.
    Replied { message_id: Uuid, reply: String },
    /// The request failed and the apology was appended.
    Failed { error: LlmError },
    /// The session was reset while the reply was in flight.
    Abandoned,
    /// Blank input; nothing was appended.
    Empty,
    /// A reply is already being generated for this session.
    Busy,
}

impl TurnOutcome {
    pub fn is_replied(&self) -> bool {
        matches!(self, TurnOutcome::Replied { .. })
    }
}

/// Reply settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct ReplySettings {
    pub mode: ReplyMode,
    pub persona: String,
    /// Empty means the provider's default model.
    pub model: String,
    pub max_tokens: Option<u32>,
}

pub struct ReplyOrchestrator {
    provider: Arc<BoxLlmProvider>,
    settings: ReplySettings,
}

enum Dispatch {
    Done(Option<Uuid>),
    Abandoned,
    Failed(LlmError),
}

impl ReplyOrchestrator {
    pub fn new(provider: Arc<BoxLlmProvider>, settings: ReplySettings) -> Self {
        Self { provider, settings }
    }

    pub fn mode(&self) -> ReplyMode {
        self.settings.mode
    }

    /// Build the reply request: persona directive first, then every message
    /// of the log with its internal role.
    pub fn build_request(&self, transcript: &[ChatMessage]) -> CompletionRequest {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(Message::system(self.settings.persona.clone()));
        messages.extend(
            transcript
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(|m| Message {
                    role: m.role,
                    content: m.content.clone(),
                }),
        );

        let model = if self.settings.model.is_empty() {
            self.provider.model().to_string()
        } else {
            self.settings.model.clone()
        };

        CompletionRequest {
            model,
            messages,
            max_tokens: self.settings.max_tokens,
            temperature: None,
            stream: self.settings.mode == ReplyMode::Streaming,
            response_format: None,
        }
    }

    /// Run one inbound turn against `session`.
    ///
    /// The session lock is only held between awaits; every continuation
    /// re-checks that the session id is unchanged before writing.
    pub async fn run_turn(&self, session: &Mutex<Session>, text: &str) -> TurnOutcome {
        self.turn(session, text, None, false).await.0
    }

    /// Like [`run_turn`](Self::run_turn), but a reply also prepares the
    /// extraction for this turn under the same lock that finalized it.
    /// `sent_at` stamps the inbound message; `None` means now.
    pub async fn run_turn_for_analysis(
        &self,
        session: &Mutex<Session>,
        text: &str,
        sent_at: Option<DateTime<Utc>>,
    ) -> (TurnOutcome, Option<PendingExtraction>) {
        self.turn(session, text, sent_at, true).await
    }

    async fn turn(
        &self,
        session: &Mutex<Session>,
        text: &str,
        sent_at: Option<DateTime<Utc>>,
        prepare_extraction: bool,
    ) -> (TurnOutcome, Option<PendingExtraction>) {
        let text = text.trim();
        if text.is_empty() {
            return (TurnOutcome::Empty, None);
        }

        let (session_id, turn, request) = {
            let mut guard = session.lock().await;
            if guard.is_loading() {
                return (TurnOutcome::Busy, None);
            }
            match sent_at {
                Some(sent_at) => guard.assembler_mut().append_user_message_at(text, sent_at),
                None => guard.assembler_mut().append_user_message(text),
            };
            let turn = guard.begin_turn();
            let request = self.build_request(guard.messages());
            (guard.id().clone(), turn, request)
        };

        tracing::info!(
            session_id = %session_id,
            turn,
            message_count = request.messages.len() - 1,
            mode = ?self.settings.mode,
            "dispatching reply request"
        );
        tracing::debug!(session_id = %session_id, text, "inbound utterance");

        let dispatch = match self.settings.mode {
            ReplyMode::Streaming => self.dispatch_streaming(session, &session_id, request).await,
            ReplyMode::SingleShot => self.dispatch_single_shot(session, &session_id, request).await,
        };

        let mut guard = session.lock().await;
        if guard.id() != &session_id {
            tracing::debug!(session_id = %session_id, turn, "session reset during reply");
            return (TurnOutcome::Abandoned, None);
        }

        let outcome = match dispatch {
            Dispatch::Abandoned => TurnOutcome::Abandoned,
            Dispatch::Done(Some(message_id)) => {
                let reply = guard
                    .messages()
                    .iter()
                    .rev()
                    .find(|m| m.id == message_id)
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                TurnOutcome::Replied { message_id, reply }
            }
            Dispatch::Done(None) => {
                tracing::warn!(session_id = %session_id, turn, "empty reply from inference service");
                let message_id = guard
                    .assembler_mut()
                    .append_assistant_message(EMPTY_REPLY_FALLBACK);
                TurnOutcome::Replied {
                    message_id,
                    reply: EMPTY_REPLY_FALLBACK.to_string(),
                }
            }
            Dispatch::Failed(error) => {
                tracing::error!(session_id = %session_id, turn, error = %error, "reply failed");
                let assembler = guard.assembler_mut();
                assembler.finalize_assistant();
                let apology = if error.is_quota() {
                    error.to_string()
                } else {
                    REPLY_ERROR_MESSAGE.to_string()
                };
                assembler.append_assistant_message(apology);
                TurnOutcome::Failed { error }
            }
        };

        let pending = if prepare_extraction && outcome.is_replied() {
            guard.prepare_extraction()
        } else {
            None
        };
        guard.set_loading(false);
        if let TurnOutcome::Replied { reply, .. } = &outcome {
            tracing::info!(session_id = %session_id, turn, reply_len = reply.len(), "reply complete");
            tracing::debug!(session_id = %session_id, reply = %reply, "persona reply");
        }
        (outcome, pending)
    }

    async fn dispatch_streaming(
        &self,
        session: &Mutex<Session>,
        session_id: &SessionId,
        request: CompletionRequest,
    ) -> Dispatch {
        let mut deltas = decode_stream(self.provider.stream(request));

        while let Some(delta) = deltas.next().await {
            let text = match delta {
                Ok(text) => text,
                Err(error) => return Dispatch::Failed(error),
            };

            let mut guard = session.lock().await;
            if guard.id() != session_id {
                return Dispatch::Abandoned;
            }
            guard.assembler_mut().apply_assistant_delta(&text);
        }

        let mut guard = session.lock().await;
        if guard.id() != session_id {
            return Dispatch::Abandoned;
        }
        Dispatch::Done(guard.assembler_mut().finalize_assistant())
    }

    async fn dispatch_single_shot(
        &self,
        session: &Mutex<Session>,
        session_id: &SessionId,
        request: CompletionRequest,
    ) -> Dispatch {
        let response = match self.provider.complete(&request).await {
            Ok(response) => response,
            Err(error) => return Dispatch::Failed(error),
        };

        if response.content.trim().is_empty() {
            return Dispatch::Done(None);
        }

        let mut guard = session.lock().await;
        if guard.id() != session_id {
            return Dispatch::Abandoned;
        }
        Dispatch::Done(Some(
            guard
                .assembler_mut()
                .append_assistant_message(response.content),
        ))
    }
}

impl std::fmt::Debug for ReplyOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyOrchestrator")
            .field("provider", &self.provider.name())
            .field("mode", &self.settings.mode)
            .finish()
    }
}
