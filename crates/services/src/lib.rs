//! Backend collaborator interfaces consumed by the voice core.
//!
//! The core only ever talks to these traits; the in-memory implementations
//! here stand in for the relational persistence layer and are also what the
//! test suites drive.  A database-backed implementation would slot in behind
//! the same traits.

pub mod customer;
pub mod image;
pub mod scheduling;

pub use customer::{Customer, CustomerDirectory, CustomerUpdate, InMemoryCustomers};
pub use image::{ImageIntake, InMemoryImageIntake, UploadGrant, UploadRequestSpec};
pub use scheduling::{
    format_clock, format_day, generate_confirmation_code, Appointment, AppointmentStatus,
    AppointmentSummary, BookingRequest, InMemoryScheduling, Scheduling, SchedulingError,
    SlotOffer, Technician, TimePreference,
};
