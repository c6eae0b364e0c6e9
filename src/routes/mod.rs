//! Router assembly: HTTP endpoints, WebSocket upgrade, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Multipart framing on top of the largest accepted image.
const UPLOAD_OVERHEAD: usize = 64 * 1024;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - CORS (allow any origin/method/headers); adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Oversized images must reach the editor so it can report them; far larger bodies are cut off.
    let upload_limit = (state.config.image.max_bytes as usize).saturating_mul(2) + UPLOAD_OVERHEAD;

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/drafts", post(http::http_create_draft))
        .route("/api/v1/drafts/:id", get(http::http_get_draft).delete(http::http_delete_draft))
        .route("/api/v1/drafts/:id/commands", post(http::http_post_command))
        .route(
            "/api/v1/drafts/:id/image",
            post(http::http_post_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/drafts/:id/submit", post(http::http_post_submit))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
