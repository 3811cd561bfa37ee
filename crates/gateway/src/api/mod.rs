//! HTTP surface: signaling webhooks, the media WebSocket endpoint, and
//! session inspection.

pub mod media;
pub mod sessions;
pub mod signaling;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build a standardized JSON error response: `{ "error": "<message>" }`.
pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/voice/incoming-call", post(signaling::incoming_call))
        .route("/voice/call-status", post(signaling::call_status))
        .route("/media/:call_sid", get(media::media_stream))
        .route("/voice/sessions", get(sessions::list_sessions))
        .route("/voice/sessions/:call_sid", get(sessions::get_session))
        .with_state(state)
}

/// GET /, service information.
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "HomeVoice",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "voice_webhook": "/voice/incoming-call",
            "status_webhook": "/voice/call-status",
            "sessions": "/voice/sessions"
        }
    }))
}

/// GET /health, liveness.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
