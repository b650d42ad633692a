//! Session inspection and lifecycle routes.
//!
//! - `GET    /api/sessions/{id}` -- snapshot
//! - `GET    /api/sessions/{id}/intelligence` -- latest report
//! - `POST   /api/sessions/{id}/final-result` -- submit to the evaluator
//! - `DELETE /api/sessions/{id}` -- drop the session
//! - `GET    /api/sessions/{id}/events` -- SSE of session events

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use lure_core::agent::HoneypotAgent;
use lure_core::session::SessionSnapshot;
use lure_types::chat::SessionId;
use lure_types::event::SessionEvent;
use lure_types::intelligence::IntelligenceReport;

use crate::http::error::AppError;
use crate::state::AppState;

fn lookup(state: &AppState, id: &str) -> Result<HoneypotAgent, AppError> {
    state
        .agent(&SessionId::from(id))
        .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(lookup(&state, &id)?.snapshot().await))
}

pub async fn get_intelligence(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IntelligenceReport>, AppError> {
    lookup(&state, &id)?
        .intelligence()
        .await
        .map(Json)
        .ok_or_else(|| AppError::Conflict("No intelligence report yet".to_string()))
}

/// Waits for in-flight extractions, then submits the latest report.
pub async fn submit_final_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let agent = lookup(&state, &id)?;
    agent.wait_for_analysis().await;

    let outcome = agent.submit_final_result().await.ok_or_else(|| {
        AppError::Conflict("No intelligence report yet; nothing to submit".to_string())
    })?;

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((
        status,
        Json(json!({
            "status": if outcome.success { "success" } else { "error" },
            "message": outcome.message,
            "response": outcome.response,
        })),
    ))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.remove(&SessionId::from(id.as_str())).await {
        tracing::info!(session_id = %id, "session deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::SessionNotFound(id))
    }
}

/// SSE event names match the `type` tag of [`SessionEvent`].
pub async fn session_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let agent = lookup(&state, &id)?;
    let events = BroadcastStream::new(agent.subscribe()).filter_map(|item| async move {
        match item {
            Ok(event) => Some(Ok::<_, Infallible>(to_sse_event(&event))),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "SSE subscriber lagged; events dropped");
                Some(Ok(Event::default()
                    .event("lagged")
                    .data(json!({"skipped": skipped}).to_string())))
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

fn to_sse_event(event: &SessionEvent) -> Event {
    let data = serde_json::to_value(event).unwrap_or_else(|e| json!({"error": e.to_string()}));
    let name = data
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("event")
        .to_string();
    Event::default().event(name).data(data.to_string())
}
