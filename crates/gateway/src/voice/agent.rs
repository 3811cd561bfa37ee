//! Conversation persona: system prompt, greeting, and the tool schema
//! exposed to the realtime model.

use hv_domain::ToolDefinition;
use hv_sessions::ConversationState;

const SYSTEM_PROMPT: &str = r#"You are a friendly and professional customer service agent for Sears Home Services. You help customers diagnose issues with their home appliances and schedule technician visits when needed.

## Your Personality
- Warm, patient, and empathetic
- Professional but conversational
- Clear and concise in your responses
- Proactive in offering help

## Conversation Flow
1. **Greeting**: Welcome the caller warmly and ask how you can help
2. **Identify Appliance**: Determine what appliance is having issues
3. **Gather Symptoms**: Understand what's wrong - symptoms, when it started, error codes
4. **Diagnostic**: Ask targeted questions based on the appliance and symptoms
5. **Troubleshooting**: Guide through basic troubleshooting steps
6. **Scheduling**: If unresolved, offer to schedule a technician visit
7. **Image Capture**: Optionally request a photo for better diagnosis
8. **Confirmation**: Summarize and confirm any scheduled appointments

## Important Guidelines
- Keep responses brief and natural for voice conversation (1-3 sentences typically)
- Ask ONE question at a time
- Acknowledge what the customer tells you before asking the next question
- Use the customer's name if provided
- Don't repeat information the customer has already given
- If the customer seems frustrated, acknowledge their frustration before helping
- Always confirm scheduling details before finalizing

## Tool Usage
You have access to tools to:
- Look up available appointment slots
- Book appointments
- Get troubleshooting steps for specific issues
- Request image uploads for visual diagnosis

Use these tools when appropriate, but always explain what you're doing in natural language."#;

const GREETING: &str = "Thank you for calling Sears Home Services. \
    My name is Alex, and I'm here to help you with any appliance issues you might be experiencing. \
    What can I help you with today?";

/// Builds the per-call instructions and the static tool list.
#[derive(Default)]
pub struct VoiceAgent;

impl VoiceAgent {
    pub fn new() -> Self {
        Self
    }

    /// The opening line injected before the first model response.
    pub fn greeting(&self) -> &'static str {
        GREETING
    }

    /// System prompt composed from the static instructions plus whatever the
    /// call has gathered so far.
    pub fn system_prompt(&self, state: &ConversationState) -> String {
        let mut parts = vec![SYSTEM_PROMPT.to_string()];

        if !state.key_facts.is_empty() {
            parts.push("\n## Current Conversation Context".into());
            for fact in &state.key_facts {
                parts.push(format!("- {fact}"));
            }
        }

        let diag = &state.diagnostic;
        if let Some(appliance) = &diag.appliance_type {
            parts.push(format!("\nAppliance: {appliance}"));
        }
        if let Some(symptom) = &diag.primary_symptom {
            parts.push(format!("Main Issue: {symptom}"));
        }
        if !diag.additional_symptoms.is_empty() {
            parts.push(format!(
                "Other Symptoms: {}",
                diag.additional_symptoms.join(", ")
            ));
        }

        let sched = &state.scheduling;
        if let Some(zip) = &sched.customer_zip_code {
            parts.push(format!("Customer Zip Code: {zip}"));
        }
        if let Some(name) = &sched.customer_name {
            parts.push(format!("Customer Name: {name}"));
        }

        parts.join("\n")
    }

    /// The five callable tools, as a static list.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "get_troubleshooting_steps".into(),
                description: "Get troubleshooting steps for a specific appliance issue. Use this \
                    to guide the customer through basic fixes before scheduling a technician."
                    .into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "appliance_type": {
                            "type": "string",
                            "description": "The type of appliance (washer, dryer, refrigerator, dishwasher, oven, hvac, etc.)"
                        },
                        "symptom": {
                            "type": "string",
                            "description": "The main symptom or issue the customer is experiencing"
                        }
                    },
                    "required": ["appliance_type", "symptom"]
                }),
            },
            ToolDefinition {
                name: "check_technician_availability".into(),
                description: "Check available appointment slots for a technician visit. Use this \
                    when the customer needs to schedule a service call."
                    .into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "zip_code": {
                            "type": "string",
                            "description": "The customer's 5-digit zip code"
                        },
                        "appliance_type": {
                            "type": "string",
                            "description": "The type of appliance that needs service"
                        },
                        "preferred_time": {
                            "type": "string",
                            "enum": ["morning", "afternoon", "any"],
                            "description": "Customer's preferred time of day for the appointment"
                        }
                    },
                    "required": ["zip_code", "appliance_type"]
                }),
            },
            ToolDefinition {
                name: "book_appointment".into(),
                description: "Book a technician appointment. Only use this after confirming the \
                    date and time with the customer."
                    .into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "slot_id": {
                            "type": "integer",
                            "description": "The ID of the time slot to book"
                        },
                        "customer_name": {
                            "type": "string",
                            "description": "The customer's full name"
                        },
                        "customer_zip_code": {
                            "type": "string",
                            "description": "The customer's zip code"
                        },
                        "appliance_type": {
                            "type": "string",
                            "description": "The type of appliance"
                        },
                        "issue_description": {
                            "type": "string",
                            "description": "Brief description of the issue"
                        }
                    },
                    "required": ["slot_id", "customer_name", "appliance_type", "issue_description"]
                }),
            },
            ToolDefinition {
                name: "request_image_upload".into(),
                description: "Send the customer a link to upload a photo of their appliance. Use \
                    this when a visual would help diagnose the issue."
                    .into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "email": {
                            "type": "string",
                            "description": "The customer's email address to send the upload link"
                        },
                        "appliance_type": {
                            "type": "string",
                            "description": "The type of appliance to photograph"
                        },
                        "specific_area": {
                            "type": "string",
                            "description": "Specific area or part to photograph (optional)"
                        }
                    },
                    "required": ["email"]
                }),
            },
            ToolDefinition {
                name: "update_customer_info".into(),
                description: "Update the customer's information in the system.".into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Customer's name"
                        },
                        "email": {
                            "type": "string",
                            "description": "Customer's email address"
                        },
                        "zip_code": {
                            "type": "string",
                            "description": "Customer's zip code"
                        },
                        "address": {
                            "type": "string",
                            "description": "Customer's street address"
                        }
                    }
                }),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_tools_with_required_subsets() {
        let agent = VoiceAgent::new();
        let tools = agent.tool_definitions();
        assert_eq!(tools.len(), 5);

        let booking = tools.iter().find(|t| t.name == "book_appointment").unwrap();
        let required: Vec<&str> = booking.parameters["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert!(required.contains(&"slot_id"));
        assert!(!required.contains(&"customer_zip_code"), "zip is optional");

        // update_customer_info has no required fields at all.
        let update = tools.iter().find(|t| t.name == "update_customer_info").unwrap();
        assert!(update.parameters.get("required").is_none());
    }

    #[test]
    fn prompt_includes_gathered_context() {
        let agent = VoiceAgent::new();
        let mut state = ConversationState::new("CA1", "+15551234567", None);
        state.add_fact("User said: my fridge is warm");
        state.diagnostic.appliance_type = Some("refrigerator".into());
        state.scheduling.customer_zip_code = Some("90210".into());

        let prompt = agent.system_prompt(&state);
        assert!(prompt.contains("## Current Conversation Context"));
        assert!(prompt.contains("- User said: my fridge is warm"));
        assert!(prompt.contains("Appliance: refrigerator"));
        assert!(prompt.contains("Customer Zip Code: 90210"));
    }

    #[test]
    fn bare_prompt_has_no_context_section() {
        let agent = VoiceAgent::new();
        let state = ConversationState::new("CA1", "+15551234567", None);
        let prompt = agent.system_prompt(&state);
        assert!(!prompt.contains("Current Conversation Context"));
        assert!(prompt.starts_with("You are a friendly and professional"));
    }
}
