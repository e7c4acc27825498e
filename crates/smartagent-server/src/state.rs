//! Application State

use std::sync::Arc;

use smartagent_core::{Agent, SessionStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Orchestration loop with its provider and tools
    pub agent: Arc<Agent>,

    /// Persisted conversations keyed by session id
    pub sessions: Arc<dyn SessionStore>,
}
