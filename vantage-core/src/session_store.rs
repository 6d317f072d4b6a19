//! Session state registry behind a store abstraction.
//!
//! The controller persists a full `WorkflowState` snapshot after every
//! transition; pollers read the last committed snapshot. The trait keeps the
//! backing swappable (in-memory map, embedded database, external store)
//! without touching the controller.

use crate::pipeline::{SessionSummary, WorkflowState};
use std::collections::HashMap;
use std::sync::RwLock;

/// Keyed store of per-run state snapshots.
pub trait SessionStore: Send + Sync {
    /// The last committed snapshot for a session, if any.
    fn get(&self, session_id: &str) -> Option<WorkflowState>;

    /// Commit a snapshot, replacing any prior one atomically.
    fn put(&self, state: &WorkflowState);

    /// Remove a session. Returns whether it existed.
    fn delete(&self, session_id: &str) -> bool;

    /// Summaries of all sessions, newest first.
    fn list(&self) -> Vec<SessionSummary>;
}

/// Process-local store backed by a `RwLock<HashMap>`.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, WorkflowState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, session_id: &str) -> Option<WorkflowState> {
        self.sessions.read().unwrap().get(session_id).cloned()
    }

    fn put(&self, state: &WorkflowState) {
        self.sessions
            .write()
            .unwrap()
            .insert(state.session_id.clone(), state.clone());
    }

    fn delete(&self, session_id: &str) -> bool {
        self.sessions.write().unwrap().remove(session_id).is_some()
    }

    fn list(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .read()
            .unwrap()
            .values()
            .map(WorkflowState::summary)
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }
}
