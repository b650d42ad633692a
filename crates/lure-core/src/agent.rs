//! The honeypot agent: one session plus the services that act on it.
//!
//! `HoneypotAgent` is the owning context for a conversation. It runs reply
//! turns, launches an extraction in the background after each successful
//! reply, and submits the final result on demand. Clones share the same
//! session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, broadcast};
use tokio_util::task::TaskTracker;

use lure_types::chat::{ChatMessage, SessionId};
use lure_types::config::LureConfig;
use lure_types::event::SessionEvent;
use lure_types::intelligence::{IntelligenceReport, SubmissionOutcome};

use crate::event::EventBus;
use crate::finalize::{BoxEvaluationSink, ResultFinalizer};
use crate::intelligence::{ExtractionError, ExtractorSettings, IntelligenceExtractor};
use crate::llm::BoxLlmProvider;
use crate::reply::{ReplyOrchestrator, ReplySettings, TurnOutcome, resolve_persona};
use crate::session::{PendingExtraction, Session, SessionSnapshot};

/// Everything the agent needs from configuration.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub reply: ReplySettings,
    pub extractor: ExtractorSettings,
}

impl AgentSettings {
    pub fn from_config(config: &LureConfig) -> Self {
        Self {
            reply: ReplySettings {
                mode: config.reply_mode,
                persona: resolve_persona(&config.persona),
                model: config.provider.model.clone(),
                max_tokens: config.provider.reply_max_tokens,
            },
            extractor: ExtractorSettings {
                categories: config.categories.resolve(),
                transcript_format: config.transcript_format,
                model: config.provider.model.clone(),
            },
        }
    }
}

#[derive(Clone)]
pub struct HoneypotAgent {
    session: Arc<Mutex<Session>>,
    orchestrator: Arc<ReplyOrchestrator>,
    extractor: Arc<IntelligenceExtractor>,
    finalizer: ResultFinalizer,
    bus: EventBus,
    tracker: TaskTracker,
}

impl HoneypotAgent {
    /// Create an agent with a freshly generated session id.
    pub fn new(
        provider: Arc<BoxLlmProvider>,
        sink: Arc<BoxEvaluationSink>,
        settings: AgentSettings,
    ) -> Self {
        Self::with_session_id(provider, sink, settings, SessionId::generate())
    }

    /// Create an agent for a caller-chosen session id.
    pub fn with_session_id(
        provider: Arc<BoxLlmProvider>,
        sink: Arc<BoxEvaluationSink>,
        settings: AgentSettings,
        session_id: SessionId,
    ) -> Self {
        let bus = EventBus::default();
        // A closed tracker still accepts tasks; `wait` then resolves whenever
        // it drains.
        let tracker = TaskTracker::new();
        tracker.close();
        Self {
            session: Arc::new(Mutex::new(Session::new(session_id, bus.clone()))),
            orchestrator: Arc::new(ReplyOrchestrator::new(provider.clone(), settings.reply)),
            extractor: Arc::new(IntelligenceExtractor::new(provider, settings.extractor)),
            finalizer: ResultFinalizer::new(sink),
            bus,
            tracker,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    pub fn extractor(&self) -> &Arc<IntelligenceExtractor> {
        &self.extractor
    }

    pub async fn session_id(&self) -> SessionId {
        self.session.lock().await.id().clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    pub async fn intelligence(&self) -> Option<IntelligenceReport> {
        self.session.lock().await.intelligence().cloned()
    }

    /// Run one inbound turn. On a successful reply an extraction over the
    /// transcript as it stood when the reply was finalized starts in the
    /// background.
    pub async fn submit_utterance(&self, text: &str) -> TurnOutcome {
        self.submit_utterance_at(text, None).await
    }

    /// [`submit_utterance`](Self::submit_utterance) for a message that
    /// carries its own send time.
    pub async fn submit_utterance_at(
        &self,
        text: &str,
        sent_at: Option<DateTime<Utc>>,
    ) -> TurnOutcome {
        let (outcome, pending) = self
            .orchestrator
            .run_turn_for_analysis(&self.session, text, sent_at)
            .await;
        if let Some(pending) = pending {
            let agent = self.clone();
            self.tracker.spawn(async move {
                agent.run_extraction(pending).await;
            });
        }
        outcome
    }

    /// Run an extraction over the current transcript and store the result
    /// if it is still the newest when it arrives.
    ///
    /// Returns the applied report. `None` when the transcript is too short,
    /// the request failed (the previous report is kept), or the result was
    /// stale.
    pub async fn analyze(&self) -> Option<IntelligenceReport> {
        let pending = self.session.lock().await.prepare_extraction()?;
        self.run_extraction(pending).await
    }

    async fn run_extraction(&self, pending: PendingExtraction) -> Option<IntelligenceReport> {
        let PendingExtraction { ticket, transcript } = pending;
        let result = self.extractor.analyze(&transcript).await;

        let mut session = self.session.lock().await;
        session.end_extraction(&ticket);
        match result {
            Ok(report) => session.apply_report(&ticket, report.clone()).then_some(report),
            Err(ExtractionError::TooShort(_)) => None,
            Err(ExtractionError::Llm(e)) => {
                tracing::warn!(
                    session_id = %ticket.session_id,
                    sequence = ticket.sequence,
                    error = %e,
                    "extraction failed; keeping previous report"
                );
                None
            }
        }
    }

    /// Wait until every background extraction started so far has finished.
    pub async fn wait_for_analysis(&self) {
        self.tracker.wait().await;
    }

    /// Submit the final result for the current report.
    ///
    /// `None`, with no outbound call, when no extraction has succeeded yet.
    pub async fn submit_final_result(&self) -> Option<SubmissionOutcome> {
        let (session_id, total, report) = {
            let session = self.session.lock().await;
            (
                session.id().clone(),
                session.messages().len(),
                session.intelligence().cloned(),
            )
        };

        let outcome = self
            .finalizer
            .finalize(&session_id, total, report.as_ref())
            .await?;

        self.session
            .lock()
            .await
            .record_submission(&session_id, outcome.clone());
        Some(outcome)
    }

    /// Discard the conversation and start a new session. Late results of
    /// in-flight work for the old session are dropped on arrival.
    pub async fn reset(&self) -> SessionId {
        let mut session = self.session.lock().await;
        let previous = session.reset();
        tracing::info!(previous = %previous, session_id = %session.id(), "session reset");
        session.id().clone()
    }

    /// Replace the log with an externally supplied history.
    pub async fn restore(&self, history: Vec<ChatMessage>) {
        let mut session = self.session.lock().await;
        tracing::debug!(session_id = %session.id(), message_count = history.len(), "restoring history");
        session.assembler_mut().restore(history);
    }
}

impl std::fmt::Debug for HoneypotAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoneypotAgent")
            .field("orchestrator", &self.orchestrator)
            .field("extractor", &self.extractor)
            .field("pending_tasks", &self.tracker.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use lure_types::chat::MessageRole;
    use lure_types::config::{ReplyMode, TranscriptFormat};
    use lure_types::intelligence::{CategorySet, ThreatLevel};
    use lure_types::llm::LlmError;

    use crate::test_support::{RecordingSink, Scripted, ScriptedProvider};

    fn settings(mode: ReplyMode) -> AgentSettings {
        AgentSettings {
            reply: ReplySettings {
                mode,
                persona: "You are Margaret.".to_string(),
                model: String::new(),
                max_tokens: None,
            },
            extractor: ExtractorSettings {
                categories: CategorySet::submission(),
                transcript_format: TranscriptFormat::Flattened,
                model: String::new(),
            },
        }
    }

    fn agent(provider: &ScriptedProvider, sink: &RecordingSink, mode: ReplyMode) -> HoneypotAgent {
        HoneypotAgent::with_session_id(
            Arc::new(BoxLlmProvider::new(provider.clone())),
            Arc::new(BoxEvaluationSink::new(sink.clone())),
            settings(mode),
            SessionId::from("wa-001"),
        )
    }

    fn analysis(is_scam: bool, threat: &str, bank_accounts: &[&str]) -> String {
        serde_json::json!({
            "isScam": is_scam,
            "scamType": if is_scam { Some("lottery") } else { None },
            "threatLevel": threat,
            "confidence": if is_scam { 90 } else { 5 },
            "extractedData": {
                "bankAccounts": bank_accounts,
                "upiIds": [],
                "phishingLinks": [],
                "phoneNumbers": [],
                "suspiciousKeywords": if is_scam { vec!["won"] } else { vec![] }
            },
            "indicators": [],
            "summary": if is_scam { "Advance-fee lottery scam." } else { "" }
        })
        .to_string()
    }

    fn report_with_confidence(confidence: u8) -> String {
        serde_json::json!({ "isScam": true, "confidence": confidence }).to_string()
    }

    async fn wait_for_analysis_requests(provider: &ScriptedProvider, n: usize) {
        while provider.analysis_requests().len() < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn scam_conversation_extracts_only_the_provided_account() {
        let provider = ScriptedProvider::new(
            vec![
                Scripted::Reply("Oh my goodness! Which account number do you need, dear?".to_string()),
                Scripted::Reply("Well now, let me find my glasses.".to_string()),
            ],
            vec![
                Scripted::Reply(analysis(true, "high", &[])),
                Scripted::Reply(analysis(true, "critical", &["50100234567891"])),
            ],
        );
        let sink = RecordingSink::ok();
        let agent = agent(&provider, &sink, ReplyMode::Streaming);

        let first = agent
            .submit_utterance(
                "Congratulations! You won $1,000,000, send your account number to claim.",
            )
            .await;
        assert!(first.is_replied());
        agent.wait_for_analysis().await;
        let report = agent.intelligence().await.unwrap();
        assert!(report.is_scam);
        assert!(report.extracted_data.get(CategorySet::BANK_ACCOUNTS).is_empty());

        agent
            .submit_utterance("Pay the Rs 5000 release fee into account 50100234567891 today.")
            .await;
        agent.wait_for_analysis().await;

        let report = agent.intelligence().await.unwrap();
        assert!(report.is_scam);
        assert_eq!(report.threat_level, ThreatLevel::Critical);
        assert_eq!(
            report.extracted_data.get(CategorySet::BANK_ACCOUNTS),
            ["50100234567891"]
        );

        let snapshot = agent.snapshot().await;
        let counterpart_text: String = snapshot
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .collect();
        for (_, values) in report.extracted_data.iter() {
            for value in values.iter().filter(|v| v.chars().all(|c| c.is_ascii_digit())) {
                assert!(counterpart_text.contains(value.as_str()), "{value} not in transcript");
            }
        }

        let last_request = provider.analysis_requests().pop().unwrap();
        assert!(last_request.messages[1].content.contains("scammer: Pay the Rs 5000"));
    }

    #[tokio::test]
    async fn casual_conversation_is_not_a_scam() {
        let provider = ScriptedProvider::new(
            vec![Scripted::Reply("Oh, it's lovely and sunny here, dear!".to_string())],
            vec![Scripted::Reply(analysis(false, "low", &[]))],
        );
        let sink = RecordingSink::ok();
        let agent = agent(&provider, &sink, ReplyMode::SingleShot);

        agent.submit_utterance("Hi, how's the weather today?").await;
        agent.wait_for_analysis().await;

        let report = agent.intelligence().await.unwrap();
        assert!(!report.is_scam);
        assert_eq!(report.threat_level, ThreatLevel::Low);
        assert!(report.extracted_data.is_empty());
        assert_eq!(report.extracted_data.categories().count(), 5);
    }

    #[tokio::test]
    async fn stale_extraction_does_not_overwrite_newer_report() {
        let provider = ScriptedProvider::new(
            vec![
                Scripted::Reply("Oh my".to_string()),
                Scripted::Reply("Goodness".to_string()),
            ],
            vec![
                Scripted::Delayed(Duration::from_millis(200), report_with_confidence(10)),
                Scripted::Delayed(Duration::from_millis(10), report_with_confidence(90)),
            ],
        );
        let sink = RecordingSink::ok();
        let agent = agent(&provider, &sink, ReplyMode::Streaming);
        let mut events = agent.subscribe();

        agent.submit_utterance("You won a prize").await;
        wait_for_analysis_requests(&provider, 1).await;
        agent.submit_utterance("Send the fee").await;
        agent.wait_for_analysis().await;

        assert_eq!(agent.intelligence().await.unwrap().confidence, 90);

        let applied: Vec<u64> = std::iter::from_fn(|| events.try_recv().ok())
            .filter_map(|e| match e {
                SessionEvent::IntelligenceUpdated { sequence, .. } => Some(sequence),
                _ => None,
            })
            .collect();
        assert_eq!(applied, vec![2]);
    }

    #[tokio::test]
    async fn extraction_sees_only_the_turn_that_triggered_it() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let provider = ScriptedProvider::new(
            vec![
                Scripted::Reply("Oh my".to_string()),
                Scripted::Gated("Part".to_string(), gate.clone(), "ial".to_string()),
            ],
            vec![
                Scripted::Reply(report_with_confidence(40)),
                Scripted::Reply(report_with_confidence(90)),
            ],
        );
        let sink = RecordingSink::ok();
        let agent = agent(&provider, &sink, ReplyMode::Streaming);

        assert!(agent.submit_utterance("first turn").await.is_replied());
        let (second, ()) = tokio::join!(agent.submit_utterance("second turn"), async {
            wait_for_analysis_requests(&provider, 1).await;
            gate.notify_one();
        });
        assert!(second.is_replied());
        agent.wait_for_analysis().await;

        let requests = provider.analysis_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].messages[1].content,
            "Analyze this conversation:\n\nscammer: first turn\n\nuser: Oh my"
        );
        assert!(requests[1].messages[1].content.ends_with("scammer: second turn\n\nuser: Partial"));
        assert_eq!(agent.intelligence().await.unwrap().confidence, 90);
    }

    #[tokio::test]
    async fn reset_drops_late_extraction() {
        let provider = ScriptedProvider::new(
            vec![Scripted::Reply("Oh my".to_string())],
            vec![Scripted::Delayed(Duration::from_millis(50), report_with_confidence(99))],
        );
        let sink = RecordingSink::ok();
        let agent = agent(&provider, &sink, ReplyMode::Streaming);

        agent.submit_utterance("You won a prize").await;
        wait_for_analysis_requests(&provider, 1).await;
        let new_id = agent.reset().await;
        agent.wait_for_analysis().await;

        assert_ne!(new_id.as_str(), "wa-001");
        let snapshot = agent.snapshot().await;
        assert_eq!(snapshot.session_id, new_id);
        assert!(snapshot.messages.is_empty());
        assert!(snapshot.intelligence.is_none());
        assert!(!snapshot.analyzing);
    }

    #[tokio::test]
    async fn failed_extraction_keeps_previous_report() {
        let provider = ScriptedProvider::new(
            vec![Scripted::Reply("Oh my".to_string()), Scripted::Reply("Dear me".to_string())],
            vec![
                Scripted::Reply(report_with_confidence(70)),
                Scripted::Fail(LlmError::Transport("timeout".to_string())),
            ],
        );
        let sink = RecordingSink::ok();
        let agent = agent(&provider, &sink, ReplyMode::SingleShot);

        agent.submit_utterance("one").await;
        agent.wait_for_analysis().await;
        agent.submit_utterance("two").await;
        agent.wait_for_analysis().await;

        assert_eq!(agent.intelligence().await.unwrap().confidence, 70);
        assert!(!agent.snapshot().await.analyzing);
    }

    #[tokio::test]
    async fn failed_reply_does_not_trigger_extraction() {
        let provider = ScriptedProvider::new(vec![Scripted::Fail(LlmError::RateLimited)], vec![]);
        let sink = RecordingSink::ok();
        let agent = agent(&provider, &sink, ReplyMode::Streaming);

        let outcome = agent.submit_utterance("hello").await;
        agent.wait_for_analysis().await;

        assert!(matches!(outcome, TurnOutcome::Failed { .. }));
        assert!(provider.analysis_requests().is_empty());
    }

    #[tokio::test]
    async fn analyze_below_two_turns_is_a_noop() {
        let provider = ScriptedProvider::default();
        let sink = RecordingSink::ok();
        let agent = agent(&provider, &sink, ReplyMode::Streaming);

        agent
            .restore(vec![ChatMessage::complete(MessageRole::User, "hello")])
            .await;
        assert!(agent.analyze().await.is_none());
        assert!(provider.requests().is_empty());
        assert!(agent.intelligence().await.is_none());
    }

    #[tokio::test]
    async fn final_result_requires_a_report() {
        let provider = ScriptedProvider::new(
            vec![Scripted::Reply("Oh my".to_string())],
            vec![Scripted::Reply(analysis(true, "high", &["1234-5678-9012"]))],
        );
        let sink = RecordingSink::ok();
        let agent = agent(&provider, &sink, ReplyMode::Streaming);

        assert!(agent.submit_final_result().await.is_none());
        assert!(sink.payloads().is_empty());

        agent.submit_utterance("Your account 1234-5678-9012 is blocked").await;
        agent.wait_for_analysis().await;

        let outcome = agent.submit_final_result().await.unwrap();
        assert!(outcome.success);

        let payloads = sink.payloads();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].session_id.as_str(), "wa-001");
        assert_eq!(payloads[0].total_messages_exchanged, 2);
        assert!(payloads[0].scam_detected);
        assert_eq!(payloads[0].agent_notes, "Advance-fee lottery scam.");
        assert!(agent.snapshot().await.last_submission.unwrap().success);
    }

    #[tokio::test]
    async fn restored_history_is_sent_with_new_turn() {
        let provider = ScriptedProvider::with_replies(vec![Scripted::Reply("Which bank?".to_string())]);
        let sink = RecordingSink::ok();
        let agent = agent(&provider, &sink, ReplyMode::SingleShot);

        agent
            .restore(vec![
                ChatMessage::complete(MessageRole::User, "Your KYC is pending"),
                ChatMessage::complete(MessageRole::Assistant, "Oh dear, what is KYC?"),
            ])
            .await;
        agent.submit_utterance("Update it now or your account closes").await;

        let request = &provider.requests()[0];
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[1].content, "Your KYC is pending");
        assert_eq!(request.messages[3].content, "Update it now or your account closes");
    }
}
