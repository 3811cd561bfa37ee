//! The voice core: agent persona + tool schema, the realtime bridge, and
//! the tool dispatcher.

pub mod agent;
pub mod bridge;
pub mod dispatcher;
