//! Process-wide live-session table.
//!
//! Keyed by the carrier call SID.  Entries are shared handles so the bridge
//! and the tool dispatcher mutate the same state; both locks are short and
//! never held across I/O.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use hv_domain::{Error, Result};

use crate::state::{ConversationPhase, ConversationState};

/// Shared handle to one call's conversation state.
pub type SessionHandle = Arc<RwLock<ConversationState>>;

/// In-memory session store.  A distributed backend (the config's Redis URL)
/// would replace this behind the same operations.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for an inbound call.  Fails if the call already has
    /// a live session.
    pub fn create(
        &self,
        call_sid: &str,
        caller_phone: &str,
        customer_id: Option<i64>,
    ) -> Result<SessionHandle> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(call_sid) {
            return Err(Error::DuplicateSession(call_sid.to_owned()));
        }

        let handle: SessionHandle = Arc::new(RwLock::new(ConversationState::new(
            call_sid,
            caller_phone,
            customer_id,
        )));
        sessions.insert(call_sid.to_owned(), handle.clone());

        tracing::info!(call_sid = %call_sid, caller = %caller_phone, "session created");
        Ok(handle)
    }

    /// Look up a live session.
    pub fn get(&self, call_sid: &str) -> Option<SessionHandle> {
        self.sessions.read().get(call_sid).cloned()
    }

    /// Bump the session's interaction clock and turn counter.
    pub fn update(&self, call_sid: &str) {
        if let Some(handle) = self.get(call_sid) {
            handle.write().update_interaction();
        }
    }

    /// Remove the session and return its final state.  Idempotent: ending an
    /// already-ended call is a no-op returning `None`.
    pub fn end(&self, call_sid: &str) -> Option<ConversationState> {
        let handle = self.sessions.write().remove(call_sid)?;
        let state = handle.read().clone();
        tracing::info!(
            call_sid = %call_sid,
            turns = state.turn_count,
            phase = %state.phase,
            "session ended"
        );
        Some(state)
    }

    /// Move the session to a new phase.  Ordering is not validated; the
    /// transition is logged.
    pub fn transition(
        &self,
        call_sid: &str,
        new_phase: ConversationPhase,
    ) -> Option<SessionHandle> {
        let handle = self.get(call_sid)?;
        {
            let mut state = handle.write();
            let old_phase = state.phase;
            state.phase = new_phase;
            state.update_interaction();
            tracing::info!(call_sid = %call_sid, from = %old_phase, to = %new_phase, "phase transition");
        }
        Some(handle)
    }

    /// Point-in-time copy of all live sessions, for inspection endpoints.
    pub fn active(&self) -> HashMap<String, ConversationState> {
        self.sessions
            .read()
            .iter()
            .map(|(sid, handle)| (sid.clone(), handle.read().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
