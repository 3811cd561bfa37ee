//! Shared domain types for HomeVoice.
//!
//! Everything process-wide and crate-agnostic lives here: the common error
//! type, the typed configuration record, and the tool call/definition types
//! exchanged between the bridge, the agent, and the dispatcher.

pub mod config;
pub mod error;
pub mod tool;

pub use config::{Config, ConfigIssue, ConfigSeverity, Secrets};
pub use error::{Error, Result};
pub use tool::{ToolCall, ToolDefinition};
