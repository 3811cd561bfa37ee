//! Carrier signaling webhooks.
//!
//! `POST /voice/incoming-call` is the entry point for every inbound call: it
//! resolves the customer, creates the session, and answers with a signaling
//! document telling the carrier to open a media stream back to us.  The body
//! is idempotent: webhook redelivery gets the same document again.
//!
//! `POST /voice/call-status` ends the session on terminal statuses.

use axum::extract::{Form, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::api::api_error;
use crate::state::AppState;

/// Call statuses that terminate the session.
const TERMINAL_STATUSES: [&str; 5] = ["completed", "busy", "failed", "no-answer", "canceled"];

#[derive(Debug, Deserialize)]
pub struct IncomingCallForm {
    #[serde(rename = "CallSid", default)]
    pub call_sid: String,
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "To", default)]
    pub to: String,
}

/// POST /voice/incoming-call
pub async fn incoming_call(
    State(state): State<AppState>,
    Form(form): Form<IncomingCallForm>,
) -> Response {
    if form.call_sid.is_empty() || form.from.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "missing CallSid or From");
    }
    tracing::info!(
        call_sid = %form.call_sid,
        from = %form.from,
        to = %form.to,
        "incoming call"
    );

    let customer = match state.customers.get_or_create(&form.from).await {
        Ok(customer) => customer,
        Err(e) => {
            tracing::error!(call_sid = %form.call_sid, error = %e, "customer lookup failed");
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, "customer lookup failed");
        }
    };

    match state
        .sessions
        .create(&form.call_sid, &form.from, Some(customer.id))
    {
        Ok(_) => {}
        Err(hv_domain::Error::DuplicateSession(_)) => {
            // Webhook redelivery: answer with the same signaling document.
            tracing::info!(call_sid = %form.call_sid, "duplicate signaling webhook, session kept");
        }
        Err(e) => {
            tracing::error!(call_sid = %form.call_sid, error = %e, "session create failed");
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, "session create failed");
        }
    }

    let twiml = connect_stream_document(
        state.config.server.public_host(),
        &form.call_sid,
        &form.from,
    );
    ([(header::CONTENT_TYPE, "application/xml")], twiml).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CallStatusForm {
    #[serde(rename = "CallSid", default)]
    pub call_sid: String,
    #[serde(rename = "CallStatus", default)]
    pub call_status: String,
}

/// POST /voice/call-status
pub async fn call_status(
    State(state): State<AppState>,
    Form(form): Form<CallStatusForm>,
) -> Response {
    tracing::info!(call_sid = %form.call_sid, status = %form.call_status, "call status update");

    if TERMINAL_STATUSES.contains(&form.call_status.as_str()) {
        // Idempotent: a repeated terminal status is a no-op.
        state.sessions.end(&form.call_sid);
    }

    "OK".into_response()
}

/// Signaling document instructing the carrier to connect a bidirectional
/// media stream to our media endpoint, carrying the call SID and caller
/// phone as stream parameters.
fn connect_stream_document(public_host: &str, call_sid: &str, caller_phone: &str) -> String {
    let call_sid = xml_escape(call_sid);
    let caller_phone = xml_escape(caller_phone);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
    <Connect>
        <Stream url="wss://{public_host}/media/{call_sid}">
            <Parameter name="call_sid" value="{call_sid}" />
            <Parameter name="customer_phone" value="{caller_phone}" />
        </Stream>
    </Connect>
</Response>"#
    )
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signaling_document_shape() {
        let doc = connect_stream_document("voice.example.com", "CA1", "+15551234567");
        assert!(doc.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(doc.contains(r#"<Stream url="wss://voice.example.com/media/CA1">"#));
        assert!(doc.contains(r#"<Parameter name="call_sid" value="CA1" />"#));
        assert!(doc.contains(r#"<Parameter name="customer_phone" value="+15551234567" />"#));
    }

    #[test]
    fn attribute_values_are_escaped() {
        let doc = connect_stream_document("host", r#"CA"1"#, "+1<&>");
        assert!(doc.contains("CA&quot;1"));
        assert!(doc.contains("+1&lt;&amp;&gt;"));
    }

    #[test]
    fn terminal_status_set() {
        for status in ["completed", "busy", "failed", "no-answer", "canceled"] {
            assert!(TERMINAL_STATUSES.contains(&status));
        }
        assert!(!TERMINAL_STATUSES.contains(&"ringing"));
        assert!(!TERMINAL_STATUSES.contains(&"in-progress"));
    }
}
