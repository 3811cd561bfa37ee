use serde::{Deserialize, Serialize};

/// A tool call decoded from the realtime model's control stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// The model's identifier for this call; echoed back on the output item.
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// Tool definition exposed to the realtime model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

impl ToolCall {
    /// Look up a string argument.
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    /// Look up an integer argument, accepting both numbers and numeric
    /// strings (the model occasionally quotes slot ids).
    pub fn arg_i64(&self, key: &str) -> Option<i64> {
        match self.arguments.get(key)? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
