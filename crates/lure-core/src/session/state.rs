//! The session object: message log, current report, and the bookkeeping
//! that sequences overlapping extractions.

use serde::Serialize;

use lure_types::chat::{ChatMessage, SessionId};
use lure_types::event::SessionEvent;
use lure_types::intelligence::{IntelligenceReport, SubmissionOutcome};

use crate::event::EventBus;
use crate::intelligence::MIN_TRANSCRIPT_TURNS;

use super::assembler::MessageAssembler;

/// Identifies one extraction request. Results are applied only if the
/// ticket still refers to the current session and is newer than every
/// result applied so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionTicket {
    pub session_id: SessionId,
    pub sequence: u64,
}

/// An extraction whose ticket and transcript were captured together.
#[derive(Debug, Clone)]
pub struct PendingExtraction {
    pub ticket: ExtractionTicket,
    pub transcript: Vec<ChatMessage>,
}

#[derive(Debug)]
pub struct Session {
    assembler: MessageAssembler,
    intelligence: Option<IntelligenceReport>,
    /// Sequence number handed to the most recent extraction request.
    issued_sequence: u64,
    /// Sequence number of the report currently stored.
    applied_sequence: u64,
    analyzing: usize,
    loading: bool,
    turns: u64,
    last_submission: Option<SubmissionOutcome>,
    bus: EventBus,
}

/// Point-in-time copy of a session, for renderers and the HTTP surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub messages: Vec<ChatMessage>,
    pub intelligence: Option<IntelligenceReport>,
    pub loading: bool,
    pub analyzing: bool,
    pub turns: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_submission: Option<SubmissionOutcome>,
}

impl Session {
    pub fn new(session_id: SessionId, bus: EventBus) -> Self {
        Self {
            assembler: MessageAssembler::new(session_id, bus.clone()),
            intelligence: None,
            issued_sequence: 0,
            applied_sequence: 0,
            analyzing: 0,
            loading: false,
            turns: 0,
            last_submission: None,
            bus,
        }
    }

    pub fn id(&self) -> &SessionId {
        self.assembler.session_id()
    }

    pub fn assembler(&self) -> &MessageAssembler {
        &self.assembler
    }

    pub fn assembler_mut(&mut self) -> &mut MessageAssembler {
        &mut self.assembler
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.assembler.messages()
    }

    pub fn intelligence(&self) -> Option<&IntelligenceReport> {
        self.intelligence.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing > 0
    }

    /// Number of inbound turns accepted in this session.
    pub fn turns(&self) -> u64 {
        self.turns
    }

    pub fn last_submission(&self) -> Option<&SubmissionOutcome> {
        self.last_submission.as_ref()
    }

    /// Start a turn: mark loading and count it.
    pub fn begin_turn(&mut self) -> u64 {
        self.turns += 1;
        self.set_loading(true);
        self.turns
    }

    pub fn set_loading(&mut self, loading: bool) {
        if self.loading == loading {
            return;
        }
        self.loading = loading;
        self.bus.publish(SessionEvent::LoadingChanged {
            session_id: self.id().clone(),
            loading,
        });
    }

    /// Register an extraction request and hand out its ticket.
    pub fn begin_extraction(&mut self) -> ExtractionTicket {
        self.issued_sequence += 1;
        self.analyzing += 1;
        if self.analyzing == 1 {
            self.publish_analyzing(true);
        }
        ExtractionTicket {
            session_id: self.id().clone(),
            sequence: self.issued_sequence,
        }
    }

    /// Issue a ticket and copy the log in one step, so the extraction sees
    /// exactly the transcript at this point.
    ///
    /// `None`, with no ticket issued, when the log is too short to analyze.
    pub fn prepare_extraction(&mut self) -> Option<PendingExtraction> {
        if self.messages().len() < MIN_TRANSCRIPT_TURNS {
            tracing::debug!(
                session_id = %self.id(),
                message_count = self.messages().len(),
                "transcript too short, skipping extraction"
            );
            return None;
        }
        let ticket = self.begin_extraction();
        Some(PendingExtraction {
            ticket,
            transcript: self.messages().to_vec(),
        })
    }

    /// Mark an extraction as finished, whatever its result.
    ///
    /// Tickets from before a reset are ignored; the reset already cleared
    /// the in-flight count.
    pub fn end_extraction(&mut self, ticket: &ExtractionTicket) {
        if &ticket.session_id != self.id() || self.analyzing == 0 {
            return;
        }
        self.analyzing -= 1;
        if self.analyzing == 0 {
            self.publish_analyzing(false);
        }
    }

    /// Store `report` if `ticket` is current and newer than the stored one.
    /// Returns whether the report was applied.
    pub fn apply_report(&mut self, ticket: &ExtractionTicket, report: IntelligenceReport) -> bool {
        if &ticket.session_id != self.id() {
            tracing::debug!(
                stale_session = %ticket.session_id,
                session_id = %self.id(),
                "dropping extraction result for a previous session"
            );
            return false;
        }
        if ticket.sequence <= self.applied_sequence {
            tracing::debug!(
                session_id = %self.id(),
                sequence = ticket.sequence,
                applied = self.applied_sequence,
                "dropping stale extraction result"
            );
            return false;
        }

        self.applied_sequence = ticket.sequence;
        self.intelligence = Some(report.clone());
        self.bus.publish(SessionEvent::IntelligenceUpdated {
            session_id: self.id().clone(),
            sequence: ticket.sequence,
            report,
        });
        true
    }

    /// Record a submission outcome, if it belongs to this session.
    pub fn record_submission(&mut self, session_id: &SessionId, outcome: SubmissionOutcome) {
        if session_id != self.id() {
            return;
        }
        self.bus.publish(SessionEvent::FinalResultSubmitted {
            session_id: session_id.clone(),
            success: outcome.success,
            message: outcome.message.clone(),
        });
        self.last_submission = Some(outcome);
    }

    /// Discard the conversation and start over under a new id.
    pub fn reset(&mut self) -> SessionId {
        self.reset_to(SessionId::generate())
    }

    pub fn reset_to(&mut self, session_id: SessionId) -> SessionId {
        self.set_loading(false);
        if self.analyzing > 0 {
            self.analyzing = 0;
            self.publish_analyzing(false);
        }
        self.intelligence = None;
        self.issued_sequence = 0;
        self.applied_sequence = 0;
        self.turns = 0;
        self.last_submission = None;
        self.assembler.reset_to(session_id)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id().clone(),
            messages: self.messages().to_vec(),
            intelligence: self.intelligence.clone(),
            loading: self.loading,
            analyzing: self.is_analyzing(),
            turns: self.turns,
            last_submission: self.last_submission.clone(),
        }
    }

    fn publish_analyzing(&self, analyzing: bool) {
        self.bus.publish(SessionEvent::AnalyzingChanged {
            session_id: self.id().clone(),
            analyzing,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lure_types::intelligence::{CategorySet, ThreatLevel};

    fn session() -> Session {
        Session::new(SessionId::from("s-1"), EventBus::new(64))
    }

    fn report(confidence: u8) -> IntelligenceReport {
        let mut report = IntelligenceReport::fallback(&CategorySet::submission());
        report.confidence = confidence;
        report.summary = format!("report {confidence}");
        report
    }

    #[test]
    fn newer_extraction_wins_regardless_of_completion_order() {
        let mut s = session();
        let older = s.begin_extraction();
        let newer = s.begin_extraction();

        assert!(s.apply_report(&newer, report(90)));
        assert!(!s.apply_report(&older, report(10)));
        assert_eq!(s.intelligence().unwrap().confidence, 90);
    }

    #[test]
    fn in_order_completion_applies_both() {
        let mut s = session();
        let first = s.begin_extraction();
        let second = s.begin_extraction();

        assert!(s.apply_report(&first, report(10)));
        assert!(s.apply_report(&second, report(20)));
        assert_eq!(s.intelligence().unwrap().confidence, 20);
    }

    #[test]
    fn results_for_previous_session_are_dropped() {
        let mut s = session();
        let ticket = s.begin_extraction();
        s.reset();

        assert!(!s.apply_report(&ticket, report(99)));
        assert!(s.intelligence().is_none());
        assert!(!s.is_analyzing());

        s.end_extraction(&ticket);
        assert!(!s.is_analyzing());
    }

    #[test]
    fn prepared_extraction_is_a_copy_of_the_log_at_that_point() {
        let mut s = session();
        s.assembler_mut().append_user_message("hi");
        assert!(s.prepare_extraction().is_none());
        assert!(!s.is_analyzing());

        s.assembler_mut().append_assistant_message("hello dear");
        let pending = s.prepare_extraction().unwrap();
        s.assembler_mut().append_user_message("next turn");
        s.assembler_mut().apply_assistant_delta("Par");

        assert_eq!(pending.ticket.sequence, 1);
        assert_eq!(pending.transcript.len(), 2);
        assert!(pending.transcript.iter().all(|m| !m.is_streaming()));
        assert!(s.is_analyzing());
    }

    #[test]
    fn analyzing_tracks_overlapping_extractions() {
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe();
        let mut s = Session::new(SessionId::from("s"), bus);

        let a = s.begin_extraction();
        let b = s.begin_extraction();
        assert!(s.is_analyzing());
        s.end_extraction(&a);
        assert!(s.is_analyzing());
        s.end_extraction(&b);
        assert!(!s.is_analyzing());

        let toggles: Vec<bool> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|e| match e {
                SessionEvent::AnalyzingChanged { analyzing, .. } => Some(analyzing),
                _ => None,
            })
            .collect();
        assert_eq!(toggles, vec![true, false]);
    }

    #[test]
    fn reset_clears_everything() {
        let mut s = session();
        s.assembler_mut().append_user_message("hi");
        s.begin_turn();
        let ticket = s.begin_extraction();
        s.apply_report(&ticket, report(50));

        let previous = s.reset();
        assert_eq!(previous.as_str(), "s-1");
        assert!(s.messages().is_empty());
        assert!(s.intelligence().is_none());
        assert!(!s.is_loading());
        assert_eq!(s.turns(), 0);

        let fresh = s.begin_extraction();
        assert_eq!(fresh.sequence, 1);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let mut s = session();
        s.assembler_mut().append_user_message("hello");
        let ticket = s.begin_extraction();
        s.apply_report(&ticket, report(5));

        let json = serde_json::to_value(s.snapshot()).unwrap();
        assert_eq!(json["sessionId"], "s-1");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["intelligence"]["threatLevel"], ThreatLevel::Low.to_string());
        assert!(json.get("lastSubmission").is_none());
    }

    #[test]
    fn submission_for_other_session_is_ignored() {
        let mut s = session();
        let outcome = SubmissionOutcome {
            success: true,
            message: "ok".to_string(),
            response: None,
        };
        s.record_submission(&SessionId::from("other"), outcome.clone());
        assert!(s.last_submission().is_none());
        s.record_submission(&SessionId::from("s-1"), outcome);
        assert!(s.last_submission().unwrap().success);
    }
}
