//! Session store
//!
//! Local mirror of the backend's session list plus the active session id.
//! Mutated only from backend results; ids and titles are never edited here.

use crate::api::Session;

#[derive(Debug, Default, Clone)]
pub struct SessionStore {
    sessions: Vec<Session>,
    active: Option<String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions in backend order
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&Session> {
        self.active.as_deref().and_then(|id| self.find(id))
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.active.as_deref() == Some(session_id)
    }

    pub fn find(&self, session_id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    /// Position in the list (sidebar index)
    pub fn position(&self, session_id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == session_id)
    }

    /// Replace the whole list with a fresh fetch
    ///
    /// The active id is kept even if the list no longer contains it: the
    /// server may not have listed a session created moments ago yet.
    pub fn replace_all(&mut self, sessions: Vec<Session>) {
        self.sessions = sessions;
    }

    /// Record a newly created session at the top of the list
    pub fn insert_created(&mut self, session: Session) {
        self.sessions.retain(|s| s.id != session.id);
        self.sessions.insert(0, session);
    }

    pub fn set_active(&mut self, session_id: Option<String>) {
        self.active = session_id;
    }

    /// Remove a session after the backend confirmed deletion
    ///
    /// Returns true if it was the active one (active is then cleared).
    pub fn remove(&mut self, session_id: &str) -> bool {
        self.sessions.retain(|s| s.id != session_id);
        if self.is_active(session_id) {
            self.active = None;
            return true;
        }
        false
    }
}
