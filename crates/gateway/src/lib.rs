//! HomeVoice gateway: the telephony-facing voice service.
//!
//! Accepts carrier signaling webhooks, bridges per-call media WebSockets to
//! the realtime conversational model, and dispatches the model's tool calls
//! against the scheduling/customer/image collaborators.

pub mod api;
pub mod cli;
pub mod state;
pub mod voice;
