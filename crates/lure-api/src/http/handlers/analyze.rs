//! POST /api/analyze -- stateless extraction over a supplied history.

use axum::Json;
use axum::extract::State;

use lure_core::intelligence::{ExtractionError, IntelligenceExtractor};
use lure_types::intelligence::IntelligenceReport;
use lure_types::wire::{AnalysisRequest, ConversationMessage};

use crate::http::error::AppError;
use crate::state::AppState;

pub async fn analyze_history(
    State(state): State<AppState>,
    Json(body): Json<AnalysisRequest>,
) -> Result<Json<IntelligenceReport>, AppError> {
    let transcript: Vec<_> = body
        .conversation_history
        .iter()
        .map(ConversationMessage::to_chat_message)
        .collect();

    let extractor =
        IntelligenceExtractor::new(state.provider.clone(), state.settings.extractor.clone());
    match extractor.analyze(&transcript).await {
        Ok(report) => {
            tracing::info!(session_id = %body.session_id, is_scam = report.is_scam, "analysis served");
            Ok(Json(report))
        }
        Err(e @ ExtractionError::TooShort(_)) => Err(AppError::Validation(e.to_string())),
        Err(ExtractionError::Llm(e)) => Err(AppError::Llm(e)),
    }
}
