//! Per-call media WebSocket endpoint.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use crate::state::AppState;
use crate::voice::bridge;

/// GET /media/:call_sid: upgrade to the carrier's media stream and run the
/// bridge until either peer is gone.
pub async fn media_stream(
    ws: WebSocketUpgrade,
    Path(call_sid): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        tracing::info!(call_sid = %call_sid, "media websocket connected");

        bridge::handle(socket, call_sid.clone(), state.clone()).await;

        // Unconditional cleanup: the status webhook also ends the session,
        // but a carrier that never sends one must not leak state.
        if state.sessions.end(&call_sid).is_some() {
            tracing::info!(call_sid = %call_sid, "session ended at media socket close");
        }
    })
}
