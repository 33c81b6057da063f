use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::watch;

use crate::error::TrackingError;
use crate::models::{Session, SessionSummary};
use crate::store::SessionStore;

/// In-memory store for tests and ephemeral setups.
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    active_tx: watch::Sender<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        let (active_tx, _) = watch::channel(None);
        Self {
            sessions: Mutex::new(HashMap::new()),
            active_tx,
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn persist(&self, session: &Session) -> Result<(), TrackingError> {
        {
            let mut sessions = self.sessions.lock().unwrap();
            if session.is_active() {
                if let Some(other) = sessions
                    .values()
                    .find(|s| s.is_active() && s.id != session.id)
                {
                    return Err(TrackingError::from(anyhow!(
                        "session {} is already active",
                        other.id
                    )));
                }
            }
            sessions.insert(session.id.clone(), session.clone());
        }

        if session.is_active() {
            self.active_tx.send_replace(Some(session.clone()));
        } else {
            let watched = self
                .active_tx
                .borrow()
                .as_ref()
                .is_some_and(|s| s.id == session.id);
            if watched {
                self.active_tx.send_replace(None);
            }
        }
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Session, TrackingError> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| TrackingError::SessionNotFound(session_id.to_string()))
    }

    async fn active_session(&self) -> Result<Option<Session>, TrackingError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .values()
            .find(|s| s.is_active())
            .cloned())
    }

    async fn list_completed(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<SessionSummary>, TrackingError> {
        let sessions = self.sessions.lock().unwrap();
        let mut completed: Vec<&Session> = sessions.values().filter(|s| !s.is_active()).collect();
        completed.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(completed
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(SessionSummary::from)
            .collect())
    }

    fn observe_active(&self) -> watch::Receiver<Option<Session>> {
        self.active_tx.subscribe()
    }
}
