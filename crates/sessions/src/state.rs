use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation phase
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Coarse-grained label on the conversation's progress.  Shapes the model's
/// instructions; not a hard state machine; transitions are logged but not
/// validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    Greeting,
    IdentifyAppliance,
    GatherSymptoms,
    Diagnostic,
    Troubleshooting,
    Scheduling,
    Confirmation,
    ImageCapture,
    Closing,
}

impl fmt::Display for ConversationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConversationPhase::Greeting => "greeting",
            ConversationPhase::IdentifyAppliance => "identify_appliance",
            ConversationPhase::GatherSymptoms => "gather_symptoms",
            ConversationPhase::Diagnostic => "diagnostic",
            ConversationPhase::Troubleshooting => "troubleshooting",
            ConversationPhase::Scheduling => "scheduling",
            ConversationPhase::Confirmation => "confirmation",
            ConversationPhase::ImageCapture => "image_capture",
            ConversationPhase::Closing => "closing",
        };
        f.write_str(s)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Gathered information
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Information gathered while diagnosing the appliance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticInfo {
    pub appliance_type: Option<String>,
    pub appliance_brand: Option<String>,
    pub appliance_model: Option<String>,
    pub appliance_age_years: Option<u32>,

    pub primary_symptom: Option<String>,
    pub additional_symptoms: Vec<String>,
    pub error_codes: Vec<String>,
    pub unusual_sounds: Option<String>,
    pub when_started: Option<String>,

    pub steps_tried: Vec<String>,
    /// Step text → observed result.
    pub step_results: HashMap<String, String>,

    pub issue_resolved: bool,
    pub resolution_notes: Option<String>,
}

/// Information for scheduling a technician visit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulingInfo {
    pub customer_zip_code: Option<String>,
    pub preferred_dates: Vec<String>,
    pub preferred_time_of_day: Option<String>,

    pub selected_technician_id: Option<i64>,
    pub selected_slot_id: Option<i64>,

    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
}

/// Image-upload round-trip state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageRequestInfo {
    pub requested: bool,
    pub upload_token: Option<String>,
    pub analysis_result: Option<String>,
}

/// What the call produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutcomeInfo {
    pub appointment_id: Option<i64>,
    pub confirmation_code: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Complete state of one live call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub call_sid: String,
    pub caller_phone: String,
    pub customer_id: Option<i64>,

    pub started_at: DateTime<Utc>,
    pub last_interaction_at: DateTime<Utc>,

    pub phase: ConversationPhase,
    pub turn_count: u64,

    pub diagnostic: DiagnosticInfo,
    pub scheduling: SchedulingInfo,
    pub image_request: ImageRequestInfo,
    pub outcome: OutcomeInfo,

    /// Short factual strings accumulated from caller transcripts; deduped,
    /// insertion order preserved.
    pub key_facts: Vec<String>,
}

impl ConversationState {
    pub fn new(
        call_sid: impl Into<String>,
        caller_phone: impl Into<String>,
        customer_id: Option<i64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            call_sid: call_sid.into(),
            caller_phone: caller_phone.into(),
            customer_id,
            started_at: now,
            last_interaction_at: now,
            phase: ConversationPhase::Greeting,
            turn_count: 0,
            diagnostic: DiagnosticInfo::default(),
            scheduling: SchedulingInfo::default(),
            image_request: ImageRequestInfo::default(),
            outcome: OutcomeInfo::default(),
            key_facts: Vec::new(),
        }
    }

    /// Bump the interaction clock and turn counter.
    pub fn update_interaction(&mut self) {
        self.last_interaction_at = Utc::now();
        self.turn_count += 1;
    }

    /// Record a key fact once; repeats are ignored.
    pub fn add_fact(&mut self, fact: impl Into<String>) {
        let fact = fact.into();
        if !self.key_facts.iter().any(|f| *f == fact) {
            self.key_facts.push(fact);
        }
    }
}
