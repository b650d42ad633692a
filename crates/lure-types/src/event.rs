//! Event types for the session event bus.
//!
//! `SessionEvent` is broadcast on every observable state change of a
//! honeypot session. Renderers (CLI, SSE clients) subscribe and redraw;
//! they hold no conversation logic of their own.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::{ChatMessage, SessionId};
use crate::intelligence::IntelligenceReport;

/// Events emitted while a session is mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A message was appended to the log.
    MessageAppended {
        session_id: SessionId,
        message: ChatMessage,
    },

    /// Text was appended to the in-progress assistant message.
    MessageDelta {
        session_id: SessionId,
        message_id: Uuid,
        text: String,
    },

    /// The in-progress assistant message will receive no more deltas.
    MessageFinalized {
        session_id: SessionId,
        message_id: Uuid,
    },

    /// A reply is (or is no longer) being generated.
    LoadingChanged { session_id: SessionId, loading: bool },

    /// An extraction is (or is no longer) in flight.
    AnalyzingChanged {
        session_id: SessionId,
        analyzing: bool,
    },

    /// The stored intelligence report was replaced.
    IntelligenceUpdated {
        session_id: SessionId,
        /// Sequence number of the extraction that produced the report.
        sequence: u64,
        report: IntelligenceReport,
    },

    /// The log was cleared and a new session id assigned.
    SessionReset {
        previous: SessionId,
        session_id: SessionId,
    },

    /// A final result submission finished.
    FinalResultSubmitted {
        session_id: SessionId,
        success: bool,
        message: String,
    },
}

impl SessionEvent {
    /// The session this event belongs to (the new id for resets).
    pub fn session_id(&self) -> &SessionId {
        match self {
            SessionEvent::MessageAppended { session_id, .. }
            | SessionEvent::MessageDelta { session_id, .. }
            | SessionEvent::MessageFinalized { session_id, .. }
            | SessionEvent::LoadingChanged { session_id, .. }
            | SessionEvent::AnalyzingChanged { session_id, .. }
            | SessionEvent::IntelligenceUpdated { session_id, .. }
            | SessionEvent::SessionReset { session_id, .. }
            | SessionEvent::FinalResultSubmitted { session_id, .. } => session_id,
        }
    }

    /// Short event name, matching the serde tag.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::MessageAppended { .. } => "message_appended",
            SessionEvent::MessageDelta { .. } => "message_delta",
            SessionEvent::MessageFinalized { .. } => "message_finalized",
            SessionEvent::LoadingChanged { .. } => "loading_changed",
            SessionEvent::AnalyzingChanged { .. } => "analyzing_changed",
            SessionEvent::IntelligenceUpdated { .. } => "intelligence_updated",
            SessionEvent::SessionReset { .. } => "session_reset",
            SessionEvent::FinalResultSubmitted { .. } => "final_result_submitted",
        }
    }
}
