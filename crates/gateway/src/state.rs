use std::sync::Arc;

use hv_domain::config::{Config, Secrets};
use hv_services::{CustomerDirectory, ImageIntake, Scheduling};
use hv_sessions::SessionStore;

use crate::voice::agent::VoiceAgent;
use crate::voice::dispatcher::ToolDispatcher;

/// Shared application state passed to all handlers.
///
/// Fields are grouped by concern:
/// - **Core**: config and startup-resolved secrets
/// - **Sessions**: the live-call table
/// - **Collaborators**: scheduling, customer directory, image intake
/// - **Voice**: agent (prompt + tool schema) and tool dispatcher
#[derive(Clone)]
pub struct AppState {
    // ── Core ─────────────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub secrets: Arc<Secrets>,

    // ── Sessions ─────────────────────────────────────────────────────
    pub sessions: Arc<SessionStore>,

    // ── Collaborators ────────────────────────────────────────────────
    pub scheduling: Arc<dyn Scheduling>,
    pub customers: Arc<dyn CustomerDirectory>,
    pub images: Arc<dyn ImageIntake>,

    // ── Voice ────────────────────────────────────────────────────────
    pub agent: Arc<VoiceAgent>,
    pub dispatcher: Arc<ToolDispatcher>,
}

impl AppState {
    /// Wire up state from config + collaborator implementations.
    pub fn new(
        config: Arc<Config>,
        secrets: Arc<Secrets>,
        scheduling: Arc<dyn Scheduling>,
        customers: Arc<dyn CustomerDirectory>,
        images: Arc<dyn ImageIntake>,
    ) -> Self {
        let dispatcher = Arc::new(ToolDispatcher::new(
            scheduling.clone(),
            customers.clone(),
            images.clone(),
        ));
        Self {
            config,
            secrets,
            sessions: Arc::new(SessionStore::new()),
            scheduling,
            customers,
            images,
            agent: Arc::new(VoiceAgent::new()),
            dispatcher,
        }
    }
}
