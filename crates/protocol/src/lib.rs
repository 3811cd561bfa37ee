//! Wire protocols for the voice bridge.
//!
//! Two independent WebSocket grammars meet in the bridge:
//! - [`carrier`]: the telephony carrier's media-stream frames (JSON text
//!   frames tagged by `event`, G.711 µ-law payloads base64-encoded).
//! - [`realtime`]: the conversational model's realtime API (JSON events
//!   tagged by `type`, control events multiplexed with audio deltas).
//!
//! The bridge forwards audio payloads opaquely; nothing here decodes audio.

pub mod carrier;
pub mod realtime;

pub use carrier::{CarrierFrame, MediaChunk, StreamStart};
pub use realtime::{
    ClientEvent, ContentPart, ConversationItem, ResponseSpec, ServerEvent, SessionConfig,
    ToolSpec, TurnDetection,
};
