//! POST /api/honeypot -- one turn of the external wire contract.
//!
//! The first request for a `sessionId` creates the session and hydrates it
//! from `conversationHistory`; later requests continue the stored log and
//! ignore the supplied history.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use lure_core::reply::TurnOutcome;
use lure_types::wire::{ConversationMessage, HoneypotRequest, HoneypotResponse, Sender};

use crate::state::AppState;

pub async fn honeypot_turn(
    State(state): State<AppState>,
    Json(body): Json<HoneypotRequest>,
) -> (StatusCode, Json<HoneypotResponse>) {
    if body.message.sender != Sender::Scammer {
        return (
            StatusCode::BAD_REQUEST,
            Json(HoneypotResponse::error("message.sender must be 'scammer'")),
        );
    }

    let history = body
        .conversation_history
        .iter()
        .map(ConversationMessage::to_chat_message)
        .collect();
    let (agent, created) = state.agent_or_hydrate(&body.session_id, history).await;

    tracing::info!(
        session_id = %body.session_id,
        created,
        channel = %body.metadata.channel,
        history_len = body.conversation_history.len(),
        "honeypot turn"
    );

    let sent_at = body.message.timestamp.to_datetime();
    match agent.submit_utterance_at(&body.message.text, sent_at).await {
        TurnOutcome::Replied { reply, .. } => {
            tracing::debug!(session_id = %body.session_id, reply = %reply, "persona replied");
            (StatusCode::OK, Json(HoneypotResponse::success(reply)))
        }
        TurnOutcome::Failed { error } => {
            let status = StatusCode::from_u16(error.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let reply = if error.is_quota() {
                error.to_string()
            } else {
                lure_core::reply::REPLY_ERROR_MESSAGE.to_string()
            };
            (status, Json(HoneypotResponse::error(reply)))
        }
        TurnOutcome::Empty => (
            StatusCode::BAD_REQUEST,
            Json(HoneypotResponse::error("message.text is empty")),
        ),
        TurnOutcome::Busy => (
            StatusCode::CONFLICT,
            Json(HoneypotResponse::error(
                "A reply is already being generated for this session",
            )),
        ),
        TurnOutcome::Abandoned => (
            StatusCode::CONFLICT,
            Json(HoneypotResponse::error("The session was reset during the reply")),
        ),
    }
}
