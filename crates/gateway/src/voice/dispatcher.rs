//! Tool dispatcher: executes a named tool against the backend collaborators
//! and renders a plain-text result for the model.
//!
//! Nothing here is allowed to take the bridge down: unknown tools, missing
//! arguments, and collaborator failures all come back as conversational
//! text the model can relay or recover from.

use std::sync::Arc;

use hv_diagnostics::{normalize_appliance, troubleshooting_steps};
use hv_domain::{Error, Result, ToolCall};
use hv_services::{
    format_clock, format_day, BookingRequest, CustomerDirectory, CustomerUpdate, ImageIntake,
    Scheduling, TimePreference, UploadRequestSpec,
};
use hv_sessions::SessionHandle;

/// Fallback text for any failure the caller shouldn't hear details of.
const RECOVERY_TEXT: &str =
    "I encountered an issue while processing that. Let me try another approach.";

pub struct ToolDispatcher {
    scheduling: Arc<dyn Scheduling>,
    customers: Arc<dyn CustomerDirectory>,
    images: Arc<dyn ImageIntake>,
}

impl ToolDispatcher {
    pub fn new(
        scheduling: Arc<dyn Scheduling>,
        customers: Arc<dyn CustomerDirectory>,
        images: Arc<dyn ImageIntake>,
    ) -> Self {
        Self {
            scheduling,
            customers,
            images,
        }
    }

    /// Execute a tool call.  Always returns a non-empty text result.
    pub async fn execute(&self, call: &ToolCall, session: &SessionHandle) -> String {
        tracing::info!(
            tool = %call.tool_name,
            call_id = %call.call_id,
            args = %call.arguments,
            "executing tool"
        );

        let result = match call.tool_name.as_str() {
            "get_troubleshooting_steps" => self.get_troubleshooting(call),
            "check_technician_availability" => self.check_availability(call, session).await,
            "book_appointment" => self.book_appointment(call, session).await,
            "request_image_upload" => self.request_image(call, session).await,
            "update_customer_info" => self.update_customer(call, session).await,
            other => Ok(format!("Unknown tool: {other}")),
        };

        match result {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(tool = %call.tool_name, error = %e, "tool execution error");
                RECOVERY_TEXT.to_string()
            }
        }
    }

    fn get_troubleshooting(&self, call: &ToolCall) -> Result<String> {
        let appliance = required(call, "appliance_type")?;
        let symptom = required(call, "symptom")?;

        let tag = canonical_appliance(appliance);
        let steps = troubleshooting_steps(&tag, symptom);
        if steps.is_empty() {
            return Ok(
                "I don't have specific troubleshooting steps for that issue, but general steps \
                 like checking power and resetting the appliance may help."
                    .into(),
            );
        }

        let formatted: Vec<String> = steps.iter().take(5).map(|s| format!("- {s}")).collect();
        Ok(format!(
            "Troubleshooting steps for {appliance} with '{symptom}':\n{}",
            formatted.join("\n")
        ))
    }

    async fn check_availability(&self, call: &ToolCall, session: &SessionHandle) -> Result<String> {
        let zip_code = required(call, "zip_code")?.to_owned();
        let appliance = required(call, "appliance_type")?.to_owned();
        let preference = call
            .arg_str("preferred_time")
            .map(TimePreference::parse)
            .unwrap_or(TimePreference::Any);

        let tag = canonical_appliance(&appliance);
        let slots = self
            .scheduling
            .list_available_slots(&zip_code, &tag, preference)
            .await
            .map_err(|e| Error::Other(e.to_string()))?;

        if slots.is_empty() {
            return Ok(format!(
                "I'm sorry, I couldn't find any available technicians for {appliance} service \
                 in the {zip_code} area. Would you like to try a different date range or check \
                 nearby zip codes?"
            ));
        }

        // Remember the zip for booking.
        session.write().scheduling.customer_zip_code = Some(zip_code.clone());

        let descriptions: Vec<String> = slots
            .iter()
            .take(5)
            .map(|slot| {
                format!(
                    "Slot {}: {} from {} to {} with {}",
                    slot.slot_id,
                    format_day(slot.date),
                    format_clock(slot.start_time),
                    format_clock(slot.end_time),
                    slot.technician_name
                )
            })
            .collect();

        Ok(format!(
            "Available appointments in {zip_code}:\n{}",
            descriptions.join("\n")
        ))
    }

    async fn book_appointment(&self, call: &ToolCall, session: &SessionHandle) -> Result<String> {
        let slot_id = call
            .arg_i64("slot_id")
            .ok_or_else(|| Error::Other("book_appointment: missing slot_id".into()))?;
        let customer_name = required(call, "customer_name")?.to_owned();
        let appliance = required(call, "appliance_type")?.to_owned();
        let issue_description = required(call, "issue_description")?.to_owned();

        // Snapshot state before any await; locks are never held across I/O.
        let (customer_id, call_sid, stored_zip, primary_symptom) = {
            let state = session.read();
            (
                state.customer_id,
                state.call_sid.clone(),
                state.scheduling.customer_zip_code.clone(),
                state.diagnostic.primary_symptom.clone(),
            )
        };
        let zip_code = call
            .arg_str("customer_zip_code")
            .map(str::to_owned)
            .or(stored_zip);

        if let Some(customer_id) = customer_id {
            let update = CustomerUpdate {
                zip_code: zip_code.clone(),
                ..CustomerUpdate::default()
            }
            .with_full_name(&customer_name);
            self.customers.update(customer_id, update).await?;
        }

        let booking = self
            .scheduling
            .book(BookingRequest {
                slot_id,
                customer_id,
                appliance_type: canonical_appliance(&appliance),
                issue_description: issue_description.clone(),
                symptoms: primary_symptom,
                call_sid: Some(call_sid),
            })
            .await;

        let appointment = match booking {
            Ok(appointment) => appointment,
            Err(e) => {
                return Ok(format!(
                    "I wasn't able to book that appointment: {e}. Let me check other available times."
                ));
            }
        };

        {
            let mut state = session.write();
            state.outcome.appointment_id = Some(appointment.id);
            state.outcome.confirmation_code = Some(appointment.confirmation_code.clone());
        }

        let details = self.scheduling.format_appointment(&appointment);
        Ok(format!(
            "Appointment booked successfully!\n\
             Confirmation Number: {}\n\
             Date: {}\n\
             Time: {}\n\
             Technician: {}\n\
             Service: {} - {}",
            details.confirmation_code,
            details.date_text,
            details.time_window_text,
            details.technician_name,
            details.appliance_type,
            details.issue_description
        ))
    }

    async fn request_image(&self, call: &ToolCall, session: &SessionHandle) -> Result<String> {
        let email = required(call, "email")?.to_owned();
        let specific_area = call.arg_str("specific_area").map(str::to_owned);

        let (customer_id, call_sid, stored_appliance, primary_symptom) = {
            let state = session.read();
            (
                state.customer_id,
                state.call_sid.clone(),
                state.diagnostic.appliance_type.clone(),
                state.diagnostic.primary_symptom.clone(),
            )
        };
        let appliance = call
            .arg_str("appliance_type")
            .map(str::to_owned)
            .or(stored_appliance);

        let grant = self
            .images
            .create_upload_request(UploadRequestSpec {
                customer_id,
                email: email.clone(),
                appliance_type: appliance.clone(),
                issue_description: primary_symptom,
                call_sid: Some(call_sid),
            })
            .await?;

        {
            let mut state = session.write();
            state.image_request.requested = true;
            state.image_request.upload_token = Some(grant.token.clone());
            state.scheduling.customer_email = Some(email.clone());
        }

        let mut message = format!("I've sent an email to {email} with a link to upload a photo");
        if let Some(area) = specific_area {
            message.push_str(&format!(" of the {area}"));
        } else if let Some(appliance) = appliance {
            message.push_str(&format!(" of your {appliance}"));
        }
        message.push_str(&format!(
            ". The link will be valid for {} hours.",
            self.images.link_ttl_hours()
        ));
        Ok(message)
    }

    async fn update_customer(&self, call: &ToolCall, session: &SessionHandle) -> Result<String> {
        let name = call.arg_str("name").map(str::to_owned);
        let email = call.arg_str("email").map(str::to_owned);
        let zip_code = call.arg_str("zip_code").map(str::to_owned);
        let address = call.arg_str("address").map(str::to_owned);

        let customer_id = {
            let mut state = session.write();
            if let Some(name) = &name {
                state.scheduling.customer_name = Some(name.clone());
            }
            if let Some(email) = &email {
                state.scheduling.customer_email = Some(email.clone());
            }
            if let Some(zip) = &zip_code {
                state.scheduling.customer_zip_code = Some(zip.clone());
            }
            if let Some(address) = &address {
                state.scheduling.customer_address = Some(address.clone());
            }
            state.customer_id
        };

        if let Some(customer_id) = customer_id {
            let mut update = CustomerUpdate {
                email,
                zip_code,
                address_line1: address,
                ..CustomerUpdate::default()
            };
            if let Some(name) = &name {
                update = update.with_full_name(name);
            }
            self.customers.update(customer_id, update).await?;
        }

        Ok("Customer information updated.".into())
    }
}

/// Canonical tag for a spoken appliance name; unknown terms pass through
/// lowercased.
fn canonical_appliance(raw: &str) -> String {
    normalize_appliance(raw)
        .map(str::to_owned)
        .unwrap_or_else(|| raw.to_lowercase())
}

fn required<'a>(call: &'a ToolCall, key: &str) -> Result<&'a str> {
    call.arg_str(key)
        .ok_or_else(|| Error::Other(format!("{}: missing argument {key}", call.tool_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::{Duration, NaiveTime, Utc};
    use parking_lot::Mutex;

    use hv_services::{
        Appointment, InMemoryCustomers, InMemoryImageIntake, InMemoryScheduling, SchedulingError,
        SlotOffer, Technician,
    };
    use hv_sessions::SessionStore;

    fn tool_call(name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall {
            call_id: "c1".into(),
            tool_name: name.into(),
            arguments: args,
        }
    }

    fn dispatcher_with(scheduling: Arc<dyn Scheduling>) -> (ToolDispatcher, Arc<InMemoryCustomers>) {
        let customers = Arc::new(InMemoryCustomers::new());
        let dispatcher = ToolDispatcher::new(
            scheduling,
            customers.clone(),
            Arc::new(InMemoryImageIntake::new("http://localhost:8080", 24)),
        );
        (dispatcher, customers)
    }

    fn seeded_scheduling() -> Arc<InMemoryScheduling> {
        let scheduling = Arc::new(InMemoryScheduling::new());
        scheduling.add_technician(Technician {
            id: 1,
            name: "Mike Johnson".into(),
            specialties: vec!["washer".into()],
            zip_codes: vec!["90210".into()],
            active: true,
        });
        scheduling.add_slot(
            42,
            1,
            Utc::now().date_naive() + Duration::days(2),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        );
        scheduling
    }

    fn session() -> SessionHandle {
        let store = SessionStore::new();
        store.create("CA1", "+15551234567", Some(1)).unwrap()
    }

    #[tokio::test]
    async fn troubleshooting_returns_bulleted_steps() {
        let (dispatcher, _) = dispatcher_with(seeded_scheduling());
        let result = dispatcher
            .execute(
                &tool_call(
                    "get_troubleshooting_steps",
                    serde_json::json!({"appliance_type": "washer", "symptom": "won't start"}),
                ),
                &session(),
            )
            .await;
        assert!(result.starts_with("Troubleshooting steps for washer"));
        assert!(result.lines().any(|l| l.starts_with("- ")));
        assert!(result.lines().filter(|l| l.starts_with("- ")).count() <= 5);
    }

    #[tokio::test]
    async fn unknown_tool_is_text_not_error() {
        let (dispatcher, _) = dispatcher_with(seeded_scheduling());
        let result = dispatcher
            .execute(&tool_call("send_fax", serde_json::json!({})), &session())
            .await;
        assert_eq!(result, "Unknown tool: send_fax");
    }

    #[tokio::test]
    async fn missing_required_args_recover_conversationally() {
        let (dispatcher, _) = dispatcher_with(seeded_scheduling());
        let result = dispatcher
            .execute(
                &tool_call("get_troubleshooting_steps", serde_json::json!({})),
                &session(),
            )
            .await;
        assert_eq!(result, RECOVERY_TEXT);
    }

    #[tokio::test]
    async fn availability_lists_slots_and_records_zip() {
        let (dispatcher, _) = dispatcher_with(seeded_scheduling());
        let handle = session();
        let result = dispatcher
            .execute(
                &tool_call(
                    "check_technician_availability",
                    serde_json::json!({"zip_code": "90210", "appliance_type": "washing machine"}),
                ),
                &handle,
            )
            .await;
        assert!(result.starts_with("Available appointments in 90210:"));
        assert!(result.contains("Slot 42:"));
        assert!(result.contains("with Mike Johnson"));
        assert_eq!(
            handle.read().scheduling.customer_zip_code.as_deref(),
            Some("90210")
        );
    }

    #[tokio::test]
    async fn availability_empty_is_apologetic_not_fatal() {
        let (dispatcher, _) = dispatcher_with(seeded_scheduling());
        let handle = session();
        let result = dispatcher
            .execute(
                &tool_call(
                    "check_technician_availability",
                    serde_json::json!({"zip_code": "10001", "appliance_type": "washer"}),
                ),
                &handle,
            )
            .await;
        assert!(result.starts_with("I'm sorry, I couldn't find any available technicians"));
        // The zip is only recorded when slots were offered.
        assert!(handle.read().scheduling.customer_zip_code.is_none());
    }

    /// Captures the appliance tag the collaborator actually receives.
    struct RecordingScheduling {
        seen_appliance: Mutex<Option<String>>,
    }

    #[async_trait]
    impl Scheduling for RecordingScheduling {
        async fn list_available_slots(
            &self,
            _zip_code: &str,
            appliance_type: &str,
            _time_preference: TimePreference,
        ) -> std::result::Result<Vec<SlotOffer>, SchedulingError> {
            *self.seen_appliance.lock() = Some(appliance_type.to_owned());
            Ok(vec![])
        }

        async fn book(
            &self,
            _request: BookingRequest,
        ) -> std::result::Result<Appointment, SchedulingError> {
            Err(SchedulingError::SlotNotFound)
        }

        async fn cancel(&self, _appointment_id: i64) -> std::result::Result<(), SchedulingError> {
            Ok(())
        }

        async fn find_by_confirmation(
            &self,
            _confirmation_code: &str,
        ) -> std::result::Result<Option<Appointment>, SchedulingError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn availability_normalizes_synonyms_before_the_collaborator() {
        let recording = Arc::new(RecordingScheduling {
            seen_appliance: Mutex::new(None),
        });
        let (dispatcher, _) = dispatcher_with(recording.clone());
        dispatcher
            .execute(
                &tool_call(
                    "check_technician_availability",
                    serde_json::json!({"zip_code": "90210", "appliance_type": "fridge"}),
                ),
                &session(),
            )
            .await;
        assert_eq!(
            recording.seen_appliance.lock().as_deref(),
            Some("refrigerator")
        );
    }

    #[tokio::test]
    async fn booking_unavailable_slot_is_recoverable() {
        let scheduling = seeded_scheduling();
        scheduling.mark_unavailable(42);
        let (dispatcher, _) = dispatcher_with(scheduling);
        let handle = session();

        let result = dispatcher
            .execute(
                &tool_call(
                    "book_appointment",
                    serde_json::json!({
                        "slot_id": 42,
                        "customer_name": "Jane Doe",
                        "appliance_type": "washer",
                        "issue_description": "won't start"
                    }),
                ),
                &handle,
            )
            .await;

        assert!(result.starts_with("I wasn't able to book"));
        let state = handle.read();
        assert!(state.outcome.appointment_id.is_none());
        assert!(state.outcome.confirmation_code.is_none());
    }

    #[tokio::test]
    async fn booking_success_records_outcome() {
        let (dispatcher, customers) = dispatcher_with(seeded_scheduling());
        let handle = session();
        // The session was created for customer 1; make sure they exist.
        customers.get_or_create("+15551234567").await.unwrap();

        let result = dispatcher
            .execute(
                &tool_call(
                    "book_appointment",
                    serde_json::json!({
                        "slot_id": 42,
                        "customer_name": "Jane Doe",
                        "customer_zip_code": "90210",
                        "appliance_type": "washer",
                        "issue_description": "won't start"
                    }),
                ),
                &handle,
            )
            .await;

        assert!(result.starts_with("Appointment booked successfully!"));
        assert!(result.contains("Confirmation Number: SHS-"));
        assert!(result.contains("Technician: Mike Johnson"));

        let state = handle.read();
        assert!(state.outcome.appointment_id.is_some());
        assert!(state
            .outcome
            .confirmation_code
            .as_deref()
            .unwrap()
            .starts_with("SHS-"));

        // The booking wrote the caller's name through to the directory.
        let customer = customers.get(1).await.unwrap().unwrap();
        assert_eq!(customer.first_name.as_deref(), Some("Jane"));
        assert_eq!(customer.last_name.as_deref(), Some("Doe"));
    }

    #[tokio::test]
    async fn image_request_issues_grant_and_updates_state() {
        let (dispatcher, _) = dispatcher_with(seeded_scheduling());
        let handle = session();
        handle.write().diagnostic.appliance_type = Some("washer".into());

        let result = dispatcher
            .execute(
                &tool_call(
                    "request_image_upload",
                    serde_json::json!({"email": "jane@example.com"}),
                ),
                &handle,
            )
            .await;

        assert!(result.starts_with("I've sent an email to jane@example.com"));
        assert!(result.contains("of your washer"));
        assert!(result.contains("valid for 24 hours"));

        let state = handle.read();
        assert!(state.image_request.requested);
        assert!(state.image_request.upload_token.is_some());
        assert_eq!(
            state.scheduling.customer_email.as_deref(),
            Some("jane@example.com")
        );
    }

    #[tokio::test]
    async fn update_customer_info_writes_through() {
        let (dispatcher, customers) = dispatcher_with(seeded_scheduling());
        let handle = session();
        customers.get_or_create("+15551234567").await.unwrap();

        let result = dispatcher
            .execute(
                &tool_call(
                    "update_customer_info",
                    serde_json::json!({"name": "Jane Doe", "zip_code": "90210"}),
                ),
                &handle,
            )
            .await;
        assert_eq!(result, "Customer information updated.");

        let state = handle.read();
        assert_eq!(state.scheduling.customer_name.as_deref(), Some("Jane Doe"));
        assert_eq!(state.scheduling.customer_zip_code.as_deref(), Some("90210"));

        let customer = customers.get(1).await.unwrap().unwrap();
        assert_eq!(customer.zip_code.as_deref(), Some("90210"));
        assert_eq!(customer.first_name.as_deref(), Some("Jane"));
    }
}
