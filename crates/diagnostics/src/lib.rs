//! In-process appliance diagnostic knowledge base.
//!
//! Everything here is pure: a closed appliance tag set with a synonym
//! lexicon, per-appliance symptom/question/troubleshooting tables, and
//! small triage heuristics.  No I/O, no state.

pub mod knowledge;
pub mod normalize;
pub mod triage;

pub use knowledge::{common_symptoms, diagnostic_questions, troubleshooting_steps};
pub use normalize::{appliance, normalize_appliance};
pub use triage::{
    diagnostic_summary, match_symptom, should_schedule_technician, Severity,
};
