//! Carrier media-stream frame grammar.
//!
//! The carrier sends JSON text frames over the per-call media WebSocket,
//! discriminated by an `event` field.  We only ever send `media` frames
//! back, addressed with the `streamSid` captured from the `start` frame.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A media-stream frame, either direction.
///
/// Inbound frames carry extra bookkeeping fields (`sequenceNumber`, `stop`,
/// `mark` payloads) that the bridge does not consume; they are ignored on
/// deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum CarrierFrame {
    /// First frame after the socket opens.
    Connected,
    /// Stream metadata; carries the `streamSid` used to address outbound media.
    Start { start: StreamStart },
    /// One 20 ms audio chunk.  Outbound media additionally carries the
    /// `streamSid`; inbound media does not.
    Media {
        #[serde(
            rename = "streamSid",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        stream_sid: Option<String>,
        media: MediaChunk,
    },
    /// The carrier closed the stream; the uplink pump exits on this.
    Stop,
    /// Playback checkpoint acknowledgment; ignored.
    Mark,
}

impl CarrierFrame {
    /// Build an outbound media frame for the given stream.
    pub fn outbound_media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        CarrierFrame::Media {
            stream_sid: Some(stream_sid.into()),
            media: MediaChunk {
                payload: payload.into(),
                timestamp: None,
            },
        }
    }
}

/// Metadata from the carrier's `start` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStart {
    pub stream_sid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_sid: Option<String>,
    /// Parameters we asked the carrier to attach in the signaling response.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_parameters: HashMap<String, String>,
}

/// A base64 G.711 µ-law payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaChunk {
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}
