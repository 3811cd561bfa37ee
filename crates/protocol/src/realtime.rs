//! Realtime model WebSocket events.
//!
//! Client events are what we send; server events are what we handle.  The
//! realtime API emits many more event types than the bridge consumes;
//! unknown types collapse into [`ServerEvent::Other`] so the downlink pump
//! never trips on protocol additions.

use serde::{Deserialize, Serialize};

use hv_domain::ToolDefinition;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client → model
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Configure turn detection, audio formats, instructions, and tools.
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },

    /// Append one carrier audio chunk to the model's input buffer.
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },

    /// Inject a conversation item (greeting, tool output).
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },

    /// Ask the model to produce a response.
    #[serde(rename = "response.create")]
    ResponseCreate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<ResponseSpec>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSpec {
    pub modalities: Vec<String>,
}

impl ResponseSpec {
    pub fn audio_and_text() -> Self {
        Self {
            modalities: vec!["audio".into(), "text".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConversationItem {
    #[serde(rename = "message")]
    Message {
        role: String,
        content: Vec<ContentPart>,
    },
    #[serde(rename = "function_call_output")]
    FunctionCallOutput { call_id: String, output: String },
}

impl ConversationItem {
    /// An assistant text message (used to seed the greeting).
    pub fn assistant_text(text: impl Into<String>) -> Self {
        ConversationItem::Message {
            role: "assistant".into(),
            content: vec![ContentPart::InputText { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "input_text")]
    InputText { text: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub turn_detection: TurnDetection,
    pub input_audio_format: String,
    pub output_audio_format: String,
    pub voice: String,
    pub instructions: String,
    pub modalities: Vec<String>,
    pub temperature: f32,
    pub tools: Vec<ToolSpec>,
    pub tool_choice: String,
}

impl SessionConfig {
    /// The bridge's standard session: server VAD, G.711 µ-law both ways,
    /// text+audio modalities, automatic tool choice.
    pub fn g711_voice_session(
        voice: impl Into<String>,
        instructions: impl Into<String>,
        tools: Vec<ToolSpec>,
    ) -> Self {
        Self {
            turn_detection: TurnDetection::default(),
            input_audio_format: "g711_ulaw".into(),
            output_audio_format: "g711_ulaw".into(),
            voice: voice.into(),
            instructions: instructions.into(),
            modalities: vec!["text".into(), "audio".into()],
            temperature: 0.7,
            tools,
            tool_choice: "auto".into(),
        }
    }
}

/// Server-side voice activity detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
    pub threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

impl Default for TurnDetection {
    fn default() -> Self {
        Self {
            kind: "server_vad".into(),
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
        }
    }
}

/// A tool entry in the realtime session's tool list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl From<&ToolDefinition> for ToolSpec {
    fn from(def: &ToolDefinition) -> Self {
        Self {
            kind: "function".into(),
            name: def.name.clone(),
            description: def.description.clone(),
            parameters: def.parameters.clone(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Model → client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "session.created")]
    SessionCreated,

    #[serde(rename = "session.updated")]
    SessionUpdated,

    /// One chunk of synthesized audio, already in the negotiated format.
    #[serde(rename = "response.audio.delta")]
    ResponseAudioDelta {
        #[serde(default)]
        delta: String,
    },

    /// Final transcript of an assistant turn.
    #[serde(rename = "response.audio_transcript.done")]
    ResponseAudioTranscriptDone {
        #[serde(default)]
        transcript: String,
    },

    /// Final transcript of a caller turn.
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputAudioTranscriptionCompleted {
        #[serde(default)]
        transcript: String,
    },

    /// A completed tool call: `arguments` is a JSON-encoded string.
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: String,
    },

    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: serde_json::Value,
    },

    /// Any event type the bridge does not consume.
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_update_wire_shape() {
        let event = ClientEvent::SessionUpdate {
            session: SessionConfig::g711_voice_session("alloy", "be helpful", vec![]),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "session.update");
        assert_eq!(json["session"]["turn_detection"]["type"], "server_vad");
        assert_eq!(json["session"]["turn_detection"]["threshold"], 0.5);
        assert_eq!(json["session"]["turn_detection"]["prefix_padding_ms"], 300);
        assert_eq!(json["session"]["turn_detection"]["silence_duration_ms"], 500);
        assert_eq!(json["session"]["input_audio_format"], "g711_ulaw");
        assert_eq!(json["session"]["output_audio_format"], "g711_ulaw");
        assert_eq!(json["session"]["tool_choice"], "auto");
    }

    #[test]
    fn response_create_omits_absent_spec() {
        let bare = serde_json::to_value(&ClientEvent::ResponseCreate { response: None }).unwrap();
        assert_eq!(bare, serde_json::json!({"type": "response.create"}));

        let with = serde_json::to_value(&ClientEvent::ResponseCreate {
            response: Some(ResponseSpec::audio_and_text()),
        })
        .unwrap();
        assert_eq!(with["response"]["modalities"][0], "audio");
    }

    #[test]
    fn function_call_output_item_shape() {
        let event = ClientEvent::ConversationItemCreate {
            item: ConversationItem::FunctionCallOutput {
                call_id: "c1".into(),
                output: "done".into(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["item"]["type"], "function_call_output");
        assert_eq!(json["item"]["call_id"], "c1");
    }

    #[test]
    fn parses_function_call_done() {
        let raw = r#"{
            "type": "response.function_call_arguments.done",
            "event_id": "ev_1",
            "response_id": "resp_1",
            "call_id": "c1",
            "name": "get_troubleshooting_steps",
            "arguments": "{\"appliance_type\":\"washer\"}"
        }"#;
        match serde_json::from_str::<ServerEvent>(raw).unwrap() {
            ServerEvent::FunctionCallArgumentsDone { call_id, name, arguments } => {
                assert_eq!(call_id, "c1");
                assert_eq!(name, "get_troubleshooting_steps");
                assert!(arguments.contains("washer"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_event_types_collapse_to_other() {
        let raw = r#"{"type":"rate_limits.updated","rate_limits":[]}"#;
        assert!(matches!(
            serde_json::from_str::<ServerEvent>(raw).unwrap(),
            ServerEvent::Other
        ));
        let raw = r#"{"type":"response.done","response":{"status":"completed"}}"#;
        assert!(matches!(
            serde_json::from_str::<ServerEvent>(raw).unwrap(),
            ServerEvent::Other
        ));
    }
}
