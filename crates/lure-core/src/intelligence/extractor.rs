//! Intelligence extraction via a JSON-mode completion.
//!
//! `IntelligenceExtractor` sends the whole transcript under the extraction
//! directive and maps the answer onto an [`IntelligenceReport`]. It never
//! touches session state; the caller decides whether the report is still
//! current when it arrives.

use std::sync::Arc;

use lure_types::chat::ChatMessage;
use lure_types::config::TranscriptFormat;
use lure_types::intelligence::{CategorySet, IntelligenceReport};
use lure_types::llm::{CompletionRequest, LlmError, Message, ResponseFormat};
use lure_types::wire::{ConversationMessage, Sender};

use crate::llm::BoxLlmProvider;

use super::directive::extraction_directive;
use super::parser::parse_report;

/// Transcripts shorter than this are not analyzed.
pub const MIN_TRANSCRIPT_TURNS: usize = 2;

const TRANSCRIPT_PREFIX: &str = "Analyze this conversation:\n\n";

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("transcript has {0} turns; at least {MIN_TRANSCRIPT_TURNS} are needed")]
    TooShort(usize),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    pub categories: CategorySet,
    pub transcript_format: TranscriptFormat,
    /// Empty means the provider's default model.
    pub model: String,
}

pub struct IntelligenceExtractor {
    provider: Arc<BoxLlmProvider>,
    settings: ExtractorSettings,
    directive: String,
}

impl IntelligenceExtractor {
    pub fn new(provider: Arc<BoxLlmProvider>, settings: ExtractorSettings) -> Self {
        let directive = extraction_directive(&settings.categories);
        Self {
            provider,
            settings,
            directive,
        }
    }

    pub fn categories(&self) -> &CategorySet {
        &self.settings.categories
    }

    /// Build the extraction request: directive as the system turn, the
    /// transcript as one user turn.
    pub fn build_request(&self, transcript: &[ChatMessage]) -> CompletionRequest {
        let body = match self.settings.transcript_format {
            TranscriptFormat::Flattened => flatten_transcript(transcript),
            TranscriptFormat::Structured => structured_transcript(transcript),
        };

        let model = if self.settings.model.is_empty() {
            self.provider.model().to_string()
        } else {
            self.settings.model.clone()
        };

        CompletionRequest {
            model,
            messages: vec![
                Message::system(self.directive.clone()),
                Message::user(format!("{TRANSCRIPT_PREFIX}{body}")),
            ],
            max_tokens: None,
            temperature: Some(0.0),
            stream: false,
            response_format: Some(ResponseFormat::JsonObject),
        }
    }

    /// Analyze a transcript.
    ///
    /// Transport and status failures are returned as errors; unusable
    /// model output is not an error and yields the fallback report.
    #[tracing::instrument(
        name = "extract_intelligence",
        skip(self, transcript),
        fields(
            provider = self.provider.name(),
            message_count = transcript.len(),
        )
    )]
    pub async fn analyze(
        &self,
        transcript: &[ChatMessage],
    ) -> Result<IntelligenceReport, ExtractionError> {
        let turns = countable_turns(transcript);
        if turns < MIN_TRANSCRIPT_TURNS {
            return Err(ExtractionError::TooShort(turns));
        }

        let request = self.build_request(transcript);
        let response = self.provider.complete(&request).await?;
        let report = parse_report(&response.content, &self.settings.categories);

        tracing::info!(
            is_scam = report.is_scam,
            threat_level = %report.threat_level,
            confidence = report.confidence,
            evidence = report.extracted_data.total(),
            "extraction complete"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for IntelligenceExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntelligenceExtractor")
            .field("provider", &self.provider.name())
            .field("categories", &self.settings.categories)
            .field("transcript_format", &self.settings.transcript_format)
            .finish()
    }
}

fn countable_turns(transcript: &[ChatMessage]) -> usize {
    transcript
        .iter()
        .filter(|m| Sender::from_role(m.role).is_some())
        .count()
}

/// `sender: text` blocks separated by blank lines, using the external
/// sender tags.
pub fn flatten_transcript(transcript: &[ChatMessage]) -> String {
    transcript
        .iter()
        .filter_map(|m| Sender::from_role(m.role).map(|s| format!("{}: {}", s.as_str(), m.content)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The turns as a JSON array of wire messages.
fn structured_transcript(transcript: &[ChatMessage]) -> String {
    let turns: Vec<ConversationMessage> = transcript
        .iter()
        .filter_map(ConversationMessage::from_chat_message)
        .collect();
    serde_json::to_string_pretty(&turns).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to serialize structured transcript; flattening instead");
        flatten_transcript(transcript)
    })
}
