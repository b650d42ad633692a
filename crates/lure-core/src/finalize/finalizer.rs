//! Builds the final payload from the current report and submits it once.

use std::sync::Arc;

use lure_types::chat::SessionId;
use lure_types::intelligence::{FinalResult, IntelligenceReport, SubmissionOutcome};

use super::sink::BoxEvaluationSink;

pub const SUBMISSION_SUCCESS: &str = "Final result submitted successfully";

#[derive(Debug, Clone)]
pub struct ResultFinalizer {
    sink: Arc<BoxEvaluationSink>,
}

impl ResultFinalizer {
    pub fn new(sink: Arc<BoxEvaluationSink>) -> Self {
        Self { sink }
    }

    /// Submit a prepared payload. Exactly one outbound call, no retry.
    #[tracing::instrument(
        skip(self, result),
        fields(
            session_id = %result.session_id,
            sink = self.sink.name(),
            scam_detected = result.scam_detected,
            message_count = result.total_messages_exchanged,
        )
    )]
    pub async fn submit(&self, result: &FinalResult) -> SubmissionOutcome {
        match self.sink.submit(result).await {
            Ok(response) => {
                tracing::info!("final result submitted");
                SubmissionOutcome {
                    success: true,
                    message: SUBMISSION_SUCCESS.to_string(),
                    response,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "final result submission failed");
                SubmissionOutcome {
                    success: false,
                    message: e.to_string(),
                    response: None,
                }
            }
        }
    }

    /// Build the payload and submit it. `None`, with no outbound call, when
    /// there is no report yet.
    pub async fn finalize(
        &self,
        session_id: &SessionId,
        total_messages: usize,
        report: Option<&IntelligenceReport>,
    ) -> Option<SubmissionOutcome> {
        let Some(report) = report else {
            tracing::debug!(session_id = %session_id, "no intelligence report, skipping submission");
            return None;
        };
        let total = u32::try_from(total_messages).unwrap_or(u32::MAX);
        let payload = FinalResult::from_report(session_id.clone(), total, report);
        Some(self.submit(&payload).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSink;
    use lure_types::error::SinkError;
    use lure_types::intelligence::{AGENT_NOTES_PLACEHOLDER, CategorySet};

    fn finalizer(sink: &RecordingSink) -> ResultFinalizer {
        ResultFinalizer::new(Arc::new(BoxEvaluationSink::new(sink.clone())))
    }

    fn scam_report() -> IntelligenceReport {
        let mut report = IntelligenceReport::fallback(&CategorySet::submission());
        report.is_scam = true;
        report.summary = "Lottery scam asking for bank details.".to_string();
        report
            .extracted_data
            .insert(CategorySet::BANK_ACCOUNTS, vec!["1234-5678-9012".to_string()]);
        report
    }

    #[tokio::test]
    async fn no_report_means_no_call() {
        let sink = RecordingSink::ok();
        let outcome = finalizer(&sink)
            .finalize(&SessionId::from("s-1"), 4, None)
            .await;
        assert!(outcome.is_none());
        assert!(sink.payloads().is_empty());
    }

    #[tokio::test]
    async fn payload_is_derived_from_report() {
        let sink = RecordingSink::ok();
        let report = scam_report();
        let outcome = finalizer(&sink)
            .finalize(&SessionId::from("s-1"), 6, Some(&report))
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.message, SUBMISSION_SUCCESS);

        let payloads = sink.payloads();
        assert_eq!(payloads.len(), 1);
        let payload = &payloads[0];
        assert_eq!(payload.session_id.as_str(), "s-1");
        assert!(payload.scam_detected);
        assert_eq!(payload.total_messages_exchanged, 6);
        assert_eq!(
            payload.extracted_intelligence.get(CategorySet::BANK_ACCOUNTS),
            ["1234-5678-9012".to_string()]
        );
        assert_eq!(payload.agent_notes, report.summary);
    }

    #[tokio::test]
    async fn blank_summary_uses_placeholder() {
        let sink = RecordingSink::ok();
        let mut report = scam_report();
        report.summary = String::new();
        finalizer(&sink)
            .finalize(&SessionId::from("s-1"), 2, Some(&report))
            .await;
        assert_eq!(sink.payloads()[0].agent_notes, AGENT_NOTES_PLACEHOLDER);
    }

    #[tokio::test]
    async fn sink_failure_is_returned_not_retried() {
        let sink = RecordingSink::failing(SinkError::Status {
            status: 503,
            body: "unavailable".to_string(),
        });
        let outcome = finalizer(&sink)
            .finalize(&SessionId::from("s-1"), 2, Some(&scam_report()))
            .await
            .unwrap();

        assert!(!outcome.success);
        assert!(outcome.message.contains("503"));
        assert_eq!(sink.payloads().len(), 1);
    }
}
