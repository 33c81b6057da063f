use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use log::{debug, info};
use tokio::sync::{watch, Mutex};

use crate::error::TrackingError;
use crate::models::{Destination, Session, SessionStatus, SessionSummary};
use crate::sources::{LocationFix, LocationSource, RiderProfileSource};
use crate::stats::{compute_stats, RideStats, StatsConfig};
use crate::store::SessionStore;
use crate::tracking::{SessionCreator, TrackingConfig};

/// Serialized front door for everything that mutates the active session.
///
/// A single mutex guards the active session, so transitions and fix
/// recording never interleave: each operation reads a consistent state,
/// persists the result, and only then updates the in-memory copy.
#[derive(Clone)]
pub struct RideController {
    active: Arc<Mutex<Option<Session>>>,
    store: Arc<dyn SessionStore>,
    creator: SessionCreator,
    profile: Arc<dyn RiderProfileSource>,
    config: TrackingConfig,
    stats_config: StatsConfig,
}

impl RideController {
    /// Builds the controller, adopting whatever active session the store
    /// still holds from a previous run.
    pub async fn new(
        store: Arc<dyn SessionStore>,
        location: Arc<dyn LocationSource>,
        profile: Arc<dyn RiderProfileSource>,
        config: TrackingConfig,
        stats_config: StatsConfig,
    ) -> Result<Self, TrackingError> {
        let active = store.active_session().await?;
        if let Some(session) = &active {
            info!("Adopted active session {} from store", session.id);
        }

        Ok(Self {
            active: Arc::new(Mutex::new(active)),
            store,
            creator: SessionCreator::new(location, config),
            profile,
            config,
            stats_config,
        })
    }

    pub async fn active_snapshot(&self) -> Option<Session> {
        self.active.lock().await.clone()
    }

    pub fn observe_active(&self) -> watch::Receiver<Option<Session>> {
        self.store.observe_active()
    }

    /// Creates and persists a new running session. Fails when another
    /// session is still active.
    pub async fn start_session(
        &self,
        destination: Option<Destination>,
    ) -> Result<Session, TrackingError> {
        let mut guard = self.active.lock().await;
        if let Some(existing) = guard.as_ref() {
            if existing.is_active() {
                return Err(TrackingError::from(anyhow!(
                    "session {} is already active",
                    existing.id
                )));
            }
        }

        let session = self.creator.create_session(destination).await?;
        self.store.persist(&session).await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Pauses the active session. Pausing a session that is not running is
    /// a no-op and nothing is written.
    pub async fn pause(&self) -> Result<(), TrackingError> {
        let mut guard = self.active.lock().await;
        let session = guard.as_mut().ok_or(TrackingError::NoActiveSession)?;
        if session.status != SessionStatus::Running {
            return Ok(());
        }

        let mut updated = session.clone();
        updated.apply_pause(Utc::now());
        self.store.persist(&updated).await?;
        info!("Paused session {} at {} ms", updated.id, updated.elapsed_ms);
        *session = updated;
        Ok(())
    }

    /// Resumes the active session. Resuming a session that is not paused is
    /// a no-op and nothing is written.
    pub async fn resume(&self) -> Result<(), TrackingError> {
        let mut guard = self.active.lock().await;
        let session = guard.as_mut().ok_or(TrackingError::NoActiveSession)?;
        if session.status != SessionStatus::Paused {
            return Ok(());
        }

        let mut updated = session.clone();
        updated.apply_resume(Utc::now());
        self.store.persist(&updated).await?;
        info!("Resumed session {}", updated.id);
        *session = updated;
        Ok(())
    }

    /// Completes the active session and returns its final state.
    pub async fn stop(&self) -> Result<Session, TrackingError> {
        let mut guard = self.active.lock().await;
        let session = guard.as_mut().ok_or(TrackingError::NoActiveSession)?;

        let mut updated = session.clone();
        updated.apply_stop(Utc::now());
        self.store.persist(&updated).await?;
        info!(
            "Completed session {}: {:.2} km in {} ms",
            updated.id, updated.traveled_km, updated.elapsed_ms
        );
        *guard = None;
        Ok(updated)
    }

    /// Folds a polled fix into the running session. Fixes that arrive while
    /// the session is not running are dropped silently.
    pub async fn record_fix(&self, fix: LocationFix) -> Result<(), TrackingError> {
        let mut guard = self.active.lock().await;
        let session = guard.as_mut().ok_or(TrackingError::NoActiveSession)?;
        if session.status != SessionStatus::Running {
            debug!("Dropping fix: session {} is not running", session.id);
            return Ok(());
        }

        let mut updated = session.clone();
        if updated.pending_segment_break {
            updated.record_segment_start(&fix);
        } else {
            let distance_km = match updated.last_point() {
                Some(last) => (self.config.distance_fn)(&last.position(), &fix.position()),
                None => 0.0,
            };
            updated.record_point(&fix, distance_km);
        }
        self.store.persist(&updated).await?;
        *session = updated;
        Ok(())
    }

    /// Recovers the running session after a process restart: reanchors the
    /// resume clock so the downtime is not counted as ride time, and the
    /// next fix opens a new segment instead of bridging the gap. A no-op
    /// unless the session is running.
    pub async fn on_service_restart(&self) -> Result<(), TrackingError> {
        let mut guard = self.active.lock().await;
        let session = guard.as_mut().ok_or(TrackingError::NoActiveSession)?;
        if session.status != SessionStatus::Running {
            return Ok(());
        }

        let mut updated = session.clone();
        updated.apply_restart_recovery(Utc::now());
        self.store.persist(&updated).await?;
        info!("Recovered session {} after service restart", updated.id);
        *session = updated;
        Ok(())
    }

    /// Derived statistics for a stored session.
    pub async fn stats_for(&self, session_id: &str) -> Result<RideStats, TrackingError> {
        let session = self.store.get(session_id).await?;
        let weight_kg = self.profile.profile().weight_kg;
        Ok(compute_stats(&session, &self.stats_config, weight_kg))
    }

    /// Completed sessions, newest first.
    pub async fn history(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<SessionSummary>, TrackingError> {
        self.store.list_completed(limit, offset).await
    }
}
