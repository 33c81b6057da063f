use anyhow::anyhow;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::watch;

use crate::db::Database;
use crate::error::TrackingError;
use crate::models::{Session, SessionSummary, TrackPoint};
use crate::store::SessionStore;

/// SQLite-backed store. Sessions are upserted whole; track points are
/// append-only, so each persist writes only the points not yet stored.
pub struct SqliteSessionStore {
    db: Database,
    active_tx: watch::Sender<Option<Session>>,
}

impl SqliteSessionStore {
    /// Opens (or creates) the database and seeds the active-session watch
    /// from whatever active session survived the last shutdown.
    pub async fn open(db_path: PathBuf) -> Result<Self, TrackingError> {
        let db = Database::new(db_path)?;
        let active = db.get_active_session().await?;
        let (active_tx, _) = watch::channel(active);
        Ok(Self { db, active_tx })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn persist(&self, session: &Session) -> Result<(), TrackingError> {
        if session.is_active() {
            if let Some(other) = self.db.active_session_id().await? {
                if other != session.id {
                    return Err(TrackingError::from(anyhow!(
                        "session {other} is already active"
                    )));
                }
            }
        }

        self.db.upsert_session(session).await?;

        let stored = self.db.count_track_points(&session.id).await?;
        let tail: Vec<TrackPoint> = session
            .track_points
            .iter()
            .skip(stored as usize)
            .cloned()
            .collect();
        if !tail.is_empty() {
            self.db
                .append_track_points(&session.id, stored, tail)
                .await?;
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
        self.db
            .get_session_with_points(session_id)
            .await?
            .ok_or_else(|| TrackingError::SessionNotFound(session_id.to_string()))
    }

    async fn active_session(&self) -> Result<Option<Session>, TrackingError> {
        Ok(self.db.get_active_session().await?)
    }

    async fn list_completed(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<SessionSummary>, TrackingError> {
        Ok(self
            .db
            .list_completed_paginated(limit as usize, offset as usize)
            .await?)
    }

    fn observe_active(&self) -> watch::Receiver<Option<Session>> {
        self.active_tx.subscribe()
    }
}
