//! Live-session inspection endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::api::api_error;
use crate::state::AppState;

/// GET /voice/sessions: snapshot of all live sessions.
pub async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.sessions.active();
    Json(serde_json::json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

/// GET /voice/sessions/:call_sid: one live session, 404 when absent.
pub async fn get_session(
    State(state): State<AppState>,
    Path(call_sid): Path<String>,
) -> Response {
    match state.sessions.get(&call_sid) {
        Some(handle) => {
            let snapshot = handle.read().clone();
            Json(snapshot).into_response()
        }
        None => api_error(StatusCode::NOT_FOUND, "session not found"),
    }
}
