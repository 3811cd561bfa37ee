//! Technician scheduling: slot search, booking, cancellation.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Caller's preferred time of day.  Anything outside the enum (the model
/// occasionally free-texts) is treated as `Any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePreference {
    Morning,
    Afternoon,
    Any,
}

impl TimePreference {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "morning" => TimePreference::Morning,
            "afternoon" => TimePreference::Afternoon,
            _ => TimePreference::Any,
        }
    }
}

/// One bookable window, with technician info for presentation to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SlotOffer {
    pub slot_id: i64,
    pub technician_id: i64,
    pub technician_name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Terminal appointments cannot be cancelled.
    pub fn is_terminal(self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }
}

/// A booked appointment, denormalized with the slot and technician fields the
/// voice layer reads back.
#[derive(Debug, Clone, Serialize)]
pub struct Appointment {
    pub id: i64,
    pub confirmation_code: String,
    pub status: AppointmentStatus,
    pub technician_id: i64,
    pub technician_name: String,
    pub customer_id: Option<i64>,
    pub slot_id: i64,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub appliance_type: String,
    pub issue_description: String,
    pub symptoms: Option<String>,
    pub call_sid: Option<String>,
}

/// Inputs to [`Scheduling::book`].
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub slot_id: i64,
    pub customer_id: Option<i64>,
    pub appliance_type: String,
    pub issue_description: String,
    pub symptoms: Option<String>,
    pub call_sid: Option<String>,
}

/// Recoverable scheduling failures.  The display texts are read back to the
/// model verbatim, so they stay conversational.
#[derive(thiserror::Error, Debug)]
pub enum SchedulingError {
    #[error("Time slot not found")]
    SlotNotFound,
    #[error("This time slot is no longer available")]
    SlotUnavailable,
    #[error("This time slot is blocked")]
    SlotBlocked,
    #[error("Appointment not found")]
    AppointmentNotFound,
    #[error("Cannot cancel appointment with status: {0}")]
    NotCancellable(&'static str),
    #[error("{0}")]
    Backend(String),
}

/// Formatted appointment details for voice read-back.  The REST layer
/// returns the same technician/date/time triple; keep the shape stable.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentSummary {
    pub confirmation_code: String,
    pub date_text: String,
    pub time_window_text: String,
    pub technician_name: String,
    pub appliance_type: String,
    pub issue_description: String,
}

/// A service technician with specialties and covered zip codes.
#[derive(Debug, Clone)]
pub struct Technician {
    pub id: i64,
    pub name: String,
    pub specialties: Vec<String>,
    pub zip_codes: Vec<String>,
    pub active: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Formatting
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// 12-hour clock with the leading zero stripped: `8:00 AM`, `12:30 PM`.
pub fn format_clock(t: NaiveTime) -> String {
    let s = t.format("%I:%M %p").to_string();
    s.strip_prefix('0').map(str::to_owned).unwrap_or(s)
}

/// Spoken-friendly date: `Monday, August 03`.
pub fn format_day(d: NaiveDate) -> String {
    d.format("%A, %B %d").to_string()
}

/// `SHS-` plus 8 uppercase alphanumerics (12 chars total).
pub fn generate_confirmation_code() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("SHS-{suffix}")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Collaborator interface
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
pub trait Scheduling: Send + Sync {
    /// Available slots matching zip, appliance specialty, and time
    /// preference.  No matching technicians is an empty list, not an error.
    async fn list_available_slots(
        &self,
        zip_code: &str,
        appliance_type: &str,
        time_preference: TimePreference,
    ) -> Result<Vec<SlotOffer>, SchedulingError>;

    /// Book a slot.  Failures are recoverable texts the model can relay.
    async fn book(&self, request: BookingRequest) -> Result<Appointment, SchedulingError>;

    /// Cancel an appointment and free its slot.  Terminal appointments
    /// cannot be cancelled.
    async fn cancel(&self, appointment_id: i64) -> Result<(), SchedulingError>;

    /// Look up an appointment by its confirmation code.
    async fn find_by_confirmation(
        &self,
        confirmation_code: &str,
    ) -> Result<Option<Appointment>, SchedulingError>;

    /// Format an appointment for voice read-back.
    fn format_appointment(&self, appointment: &Appointment) -> AppointmentSummary {
        AppointmentSummary {
            confirmation_code: appointment.confirmation_code.clone(),
            date_text: format_day(appointment.date),
            time_window_text: format!(
                "{} to {}",
                format_clock(appointment.start_time),
                format_clock(appointment.end_time)
            ),
            technician_name: appointment.technician_name.clone(),
            appliance_type: appointment.appliance_type.clone(),
            issue_description: appointment.issue_description.clone(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-memory implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
struct SlotRow {
    id: i64,
    technician_id: i64,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    available: bool,
    blocked: bool,
}

#[derive(Default)]
struct Tables {
    technicians: HashMap<i64, Technician>,
    slots: BTreeMap<i64, SlotRow>,
    appointments: HashMap<i64, Appointment>,
    next_appointment_id: i64,
}

/// In-memory scheduling tables.
#[derive(Default)]
pub struct InMemoryScheduling {
    tables: RwLock<Tables>,
}

impl InMemoryScheduling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_technician(&self, technician: Technician) {
        self.tables
            .write()
            .technicians
            .insert(technician.id, technician);
    }

    pub fn add_slot(
        &self,
        id: i64,
        technician_id: i64,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) {
        self.tables.write().slots.insert(
            id,
            SlotRow {
                id,
                technician_id,
                date,
                start_time,
                end_time,
                available: true,
                blocked: false,
            },
        );
    }

    /// Mark a slot unavailable (e.g. booked out-of-band).
    pub fn mark_unavailable(&self, slot_id: i64) {
        if let Some(slot) = self.tables.write().slots.get_mut(&slot_id) {
            slot.available = false;
        }
    }

    /// Force an appointment into a status (test/seed helper).
    pub fn set_appointment_status(&self, appointment_id: i64, status: AppointmentStatus) {
        if let Some(appt) = self.tables.write().appointments.get_mut(&appointment_id) {
            appt.status = status;
        }
    }
}

#[async_trait]
impl Scheduling for InMemoryScheduling {
    async fn list_available_slots(
        &self,
        zip_code: &str,
        appliance_type: &str,
        time_preference: TimePreference,
    ) -> Result<Vec<SlotOffer>, SchedulingError> {
        // Booking window: tomorrow through two weeks out.
        let today = Utc::now().date_naive();
        let window_start = today + Duration::days(1);
        let window_end = window_start + Duration::days(14);
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();

        let tables = self.tables.read();
        let mut offers: Vec<SlotOffer> = tables
            .slots
            .values()
            .filter(|slot| slot.available && !slot.blocked)
            .filter(|slot| slot.date >= window_start && slot.date <= window_end)
            .filter(|slot| match time_preference {
                TimePreference::Morning => slot.start_time < noon,
                TimePreference::Afternoon => slot.start_time >= noon,
                TimePreference::Any => true,
            })
            .filter_map(|slot| {
                let tech = tables.technicians.get(&slot.technician_id)?;
                let serves = tech.active
                    && tech.zip_codes.iter().any(|z| z == zip_code)
                    && tech.specialties.iter().any(|s| s == appliance_type);
                serves.then(|| SlotOffer {
                    slot_id: slot.id,
                    technician_id: tech.id,
                    technician_name: tech.name.clone(),
                    date: slot.date,
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                })
            })
            .collect();

        offers.sort_by_key(|o| (o.date, o.start_time, o.slot_id));
        Ok(offers)
    }

    async fn book(&self, request: BookingRequest) -> Result<Appointment, SchedulingError> {
        let mut tables = self.tables.write();

        let slot = tables
            .slots
            .get(&request.slot_id)
            .cloned()
            .ok_or(SchedulingError::SlotNotFound)?;
        if !slot.available {
            return Err(SchedulingError::SlotUnavailable);
        }
        if slot.blocked {
            return Err(SchedulingError::SlotBlocked);
        }

        let technician_name = tables
            .technicians
            .get(&slot.technician_id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| "Unassigned".into());

        if let Some(row) = tables.slots.get_mut(&request.slot_id) {
            row.available = false;
        }

        tables.next_appointment_id += 1;
        let id = tables.next_appointment_id;
        let appointment = Appointment {
            id,
            confirmation_code: generate_confirmation_code(),
            status: AppointmentStatus::Scheduled,
            technician_id: slot.technician_id,
            technician_name,
            customer_id: request.customer_id,
            slot_id: slot.id,
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            appliance_type: request.appliance_type,
            issue_description: request.issue_description,
            symptoms: request.symptoms,
            call_sid: request.call_sid,
        };
        tables.appointments.insert(id, appointment.clone());

        tracing::info!(
            appointment_id = id,
            confirmation = %appointment.confirmation_code,
            slot_id = slot.id,
            "appointment booked"
        );
        Ok(appointment)
    }

    async fn cancel(&self, appointment_id: i64) -> Result<(), SchedulingError> {
        let mut tables = self.tables.write();

        let status = tables
            .appointments
            .get(&appointment_id)
            .map(|a| a.status)
            .ok_or(SchedulingError::AppointmentNotFound)?;
        if status.is_terminal() {
            return Err(SchedulingError::NotCancellable(status.as_str()));
        }

        let slot_id = {
            let appt = tables
                .appointments
                .get_mut(&appointment_id)
                .ok_or(SchedulingError::AppointmentNotFound)?;
            appt.status = AppointmentStatus::Cancelled;
            appt.slot_id
        };
        if let Some(slot) = tables.slots.get_mut(&slot_id) {
            slot.available = true;
        }

        tracing::info!(appointment_id, "appointment cancelled");
        Ok(())
    }

    async fn find_by_confirmation(
        &self,
        confirmation_code: &str,
    ) -> Result<Option<Appointment>, SchedulingError> {
        Ok(self
            .tables
            .read()
            .appointments
            .values()
            .find(|a| a.confirmation_code == confirmation_code)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> InMemoryScheduling {
        let scheduling = InMemoryScheduling::new();
        scheduling.add_technician(Technician {
            id: 1,
            name: "Mike Johnson".into(),
            specialties: vec!["washer".into(), "dryer".into()],
            zip_codes: vec!["90210".into()],
            active: true,
        });
        scheduling.add_technician(Technician {
            id: 2,
            name: "Sarah Williams".into(),
            specialties: vec!["refrigerator".into()],
            zip_codes: vec!["90210".into(), "90211".into()],
            active: true,
        });

        let base = Utc::now().date_naive() + Duration::days(2);
        let t8 = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let t10 = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let t13 = NaiveTime::from_hms_opt(13, 0, 0).unwrap();
        let t15 = NaiveTime::from_hms_opt(15, 0, 0).unwrap();
        scheduling.add_slot(10, 1, base, t8, t10);
        scheduling.add_slot(11, 1, base, t13, t15);
        scheduling.add_slot(20, 2, base + Duration::days(1), t8, t10);
        scheduling
    }

    #[tokio::test]
    async fn filters_by_zip_specialty_and_time() {
        let scheduling = seeded();

        let offers = scheduling
            .list_available_slots("90210", "washer", TimePreference::Any)
            .await
            .unwrap();
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].slot_id, 10, "ordered by date then time");

        let morning = scheduling
            .list_available_slots("90210", "washer", TimePreference::Morning)
            .await
            .unwrap();
        assert_eq!(morning.len(), 1);
        assert_eq!(morning[0].slot_id, 10);

        let afternoon = scheduling
            .list_available_slots("90210", "washer", TimePreference::Afternoon)
            .await
            .unwrap();
        assert_eq!(afternoon.len(), 1);
        assert_eq!(afternoon[0].slot_id, 11);
    }

    #[tokio::test]
    async fn no_matching_technicians_is_empty_not_error() {
        let scheduling = seeded();
        let offers = scheduling
            .list_available_slots("10001", "washer", TimePreference::Any)
            .await
            .unwrap();
        assert!(offers.is_empty());

        let offers = scheduling
            .list_available_slots("90210", "hvac", TimePreference::Any)
            .await
            .unwrap();
        assert!(offers.is_empty());
    }

    #[tokio::test]
    async fn booking_takes_the_slot() {
        let scheduling = seeded();
        let appointment = scheduling
            .book(BookingRequest {
                slot_id: 10,
                customer_id: Some(7),
                appliance_type: "washer".into(),
                issue_description: "won't start".into(),
                symptoms: None,
                call_sid: Some("CA1".into()),
            })
            .await
            .unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
        assert_eq!(appointment.technician_name, "Mike Johnson");

        // The slot is now gone from availability.
        let offers = scheduling
            .list_available_slots("90210", "washer", TimePreference::Any)
            .await
            .unwrap();
        assert!(offers.iter().all(|o| o.slot_id != 10));

        // And a second booking of the same slot fails recoverably.
        let err = scheduling
            .book(BookingRequest {
                slot_id: 10,
                customer_id: None,
                appliance_type: "washer".into(),
                issue_description: "won't start".into(),
                symptoms: None,
                call_sid: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "This time slot is no longer available");
    }

    #[tokio::test]
    async fn booking_missing_slot_fails() {
        let scheduling = seeded();
        let err = scheduling
            .book(BookingRequest {
                slot_id: 999,
                customer_id: None,
                appliance_type: "washer".into(),
                issue_description: "broken".into(),
                symptoms: None,
                call_sid: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Time slot not found");
    }

    #[tokio::test]
    async fn cancel_frees_slot_and_rejects_terminal() {
        let scheduling = seeded();
        let appointment = scheduling
            .book(BookingRequest {
                slot_id: 10,
                customer_id: None,
                appliance_type: "washer".into(),
                issue_description: "won't start".into(),
                symptoms: None,
                call_sid: None,
            })
            .await
            .unwrap();

        scheduling.cancel(appointment.id).await.unwrap();
        let offers = scheduling
            .list_available_slots("90210", "washer", TimePreference::Any)
            .await
            .unwrap();
        assert!(offers.iter().any(|o| o.slot_id == 10), "slot freed");

        // A cancelled appointment is terminal.
        let err = scheduling.cancel(appointment.id).await.unwrap_err();
        assert!(err.to_string().contains("cancelled"));

        let err = scheduling.cancel(12345).await.unwrap_err();
        assert_eq!(err.to_string(), "Appointment not found");
    }

    #[tokio::test]
    async fn find_by_confirmation_round_trip() {
        let scheduling = seeded();
        let appointment = scheduling
            .book(BookingRequest {
                slot_id: 20,
                customer_id: None,
                appliance_type: "refrigerator".into(),
                issue_description: "not cooling".into(),
                symptoms: None,
                call_sid: None,
            })
            .await
            .unwrap();
        let found = scheduling
            .find_by_confirmation(&appointment.confirmation_code)
            .await
            .unwrap()
            .expect("appointment should be found");
        assert_eq!(found.id, appointment.id);
        assert!(scheduling.find_by_confirmation("SHS-NOPE0000").await.unwrap().is_none());
    }

    #[test]
    fn confirmation_code_shape() {
        let a = generate_confirmation_code();
        let b = generate_confirmation_code();
        for code in [&a, &b] {
            assert_eq!(code.len(), 12);
            assert!(code.starts_with("SHS-"));
            assert!(code[4..]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
        assert_ne!(a, b);
    }

    #[test]
    fn clock_formatting_strips_leading_zero() {
        assert_eq!(format_clock(NaiveTime::from_hms_opt(8, 0, 0).unwrap()), "8:00 AM");
        assert_eq!(format_clock(NaiveTime::from_hms_opt(12, 30, 0).unwrap()), "12:30 PM");
        assert_eq!(format_clock(NaiveTime::from_hms_opt(0, 5, 0).unwrap()), "12:05 AM");
    }

    #[test]
    fn summary_preserves_response_triple() {
        let scheduling = InMemoryScheduling::new();
        let appointment = Appointment {
            id: 1,
            confirmation_code: "SHS-ABCD1234".into(),
            status: AppointmentStatus::Scheduled,
            technician_id: 1,
            technician_name: "Mike Johnson".into(),
            customer_id: None,
            slot_id: 10,
            date: NaiveDate::from_ymd_opt(2026, 8, 3).unwrap(),
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            appliance_type: "washer".into(),
            issue_description: "won't start".into(),
            symptoms: None,
            call_sid: None,
        };
        let summary = scheduling.format_appointment(&appointment);
        assert_eq!(summary.technician_name, "Mike Johnson");
        assert_eq!(summary.date_text, "Monday, August 03");
        assert_eq!(summary.time_window_text, "8:00 AM to 10:00 AM");
    }
}
