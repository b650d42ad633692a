//! Axum router configuration with middleware.
//!
//! The wire contract lives at `/api/honeypot`; session routes are under
//! `/api/sessions/{id}`. Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/honeypot", post(handlers::honeypot::honeypot_turn))
        .route("/analyze", post(handlers::analyze::analyze_history))
        .route(
            "/sessions/{id}",
            get(handlers::session::get_session).delete(handlers::session::delete_session),
        )
        .route(
            "/sessions/{id}/intelligence",
            get(handlers::session::get_intelligence),
        )
        .route(
            "/sessions/{id}/final-result",
            post(handlers::session::submit_final_result),
        )
        .route("/sessions/{id}/events", get(handlers::session::session_events));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
