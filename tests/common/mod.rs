#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};

use ridelog::{
    GeoPoint, LocationFix, LocationSettingsSource, LocationSource, MemorySessionStore,
    NutritionReminderSource, ReminderEvent, ReminderKind, RideController, RiderProfile,
    RiderProfileSource, Session, SessionStatus, SessionSummary, SessionStore, TrackingConfig,
    TrackingDelegate, TrackingError,
};

/// Routes crate logs into the test harness when RUST_LOG is set.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn fix_at(latitude: f64, longitude: f64, recorded_at: DateTime<Utc>) -> LocationFix {
    LocationFix {
        latitude,
        longitude,
        altitude_m: None,
        accuracy_m: Some(5.0),
        recorded_at,
    }
}

pub fn poor_fix_at(latitude: f64, longitude: f64, recorded_at: DateTime<Utc>) -> LocationFix {
    LocationFix {
        accuracy_m: Some(50.0),
        ..fix_at(latitude, longitude, recorded_at)
    }
}

/// Distance stub that charges a fixed 1.5 km per leg.
pub fn fixed_distance(_: &GeoPoint, _: &GeoPoint) -> f64 {
    1.5
}

/// Config with intervals small enough for tests to observe several ticks.
pub fn fast_config() -> TrackingConfig {
    TrackingConfig {
        location_poll_interval: Duration::from_millis(20),
        elapsed_report_interval: Duration::from_millis(20),
        creation_attempts: 3,
        creation_retry_delay: Duration::from_millis(5),
        max_accuracy_m: 20.0,
        distance_fn: fixed_distance,
    }
}

/// Location source that plays back a script of responses. Once the script is
/// exhausted it keeps returning the last successful fix, like a stationary
/// device would.
pub struct ScriptedLocation {
    script: Mutex<VecDeque<Result<LocationFix, String>>>,
    last_fix: Mutex<Option<LocationFix>>,
    updates: broadcast::Sender<LocationFix>,
    calls: AtomicUsize,
}

impl ScriptedLocation {
    pub fn new(script: Vec<Result<LocationFix, String>>) -> Self {
        let (updates, _) = broadcast::channel(16);
        Self {
            script: Mutex::new(script.into()),
            last_fix: Mutex::new(None),
            updates,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationSource for ScriptedLocation {
    async fn current_location(&self) -> Result<LocationFix> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let served = match next {
            Some(Ok(fix)) => {
                *self.last_fix.lock().unwrap() = Some(fix.clone());
                Ok(fix)
            }
            Some(Err(message)) => Err(anyhow!(message)),
            None => self
                .last_fix
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| anyhow!("no location available")),
        };
        if let Ok(fix) = &served {
            let _ = self.updates.send(fix.clone());
        }
        served
    }

    fn observe(&self) -> broadcast::Receiver<LocationFix> {
        self.updates.subscribe()
    }
}

/// Settings source backed by a watch channel the test can flip.
pub struct ToggleSettings {
    tx: watch::Sender<bool>,
}

impl ToggleSettings {
    pub fn new(enabled: bool) -> Self {
        let (tx, _) = watch::channel(enabled);
        Self { tx }
    }

    pub fn set(&self, enabled: bool) {
        self.tx.send_replace(enabled);
    }
}

#[async_trait]
impl LocationSettingsSource for ToggleSettings {
    async fn is_enabled(&self) -> Result<bool> {
        Ok(*self.tx.borrow())
    }

    fn observe_enabled(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Reminder source the test fires by hand.
pub struct ManualReminders {
    tx: broadcast::Sender<ReminderEvent>,
}

impl ManualReminders {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn emit(&self, kind: ReminderKind) {
        let _ = self.tx.send(ReminderEvent {
            kind,
            issued_at: Utc::now(),
        });
    }
}

impl NutritionReminderSource for ManualReminders {
    fn subscribe(&self) -> broadcast::Receiver<ReminderEvent> {
        self.tx.subscribe()
    }
}

pub struct StaticProfile {
    pub weight_kg: Option<f64>,
}

impl RiderProfileSource for StaticProfile {
    fn profile(&self) -> RiderProfile {
        RiderProfile {
            weight_kg: self.weight_kg,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DelegateEvent {
    StartForeground(String),
    NotificationUpdate(String, u64),
    StopService,
    Vibrate(ReminderKind),
}

/// Delegate that records every callback for later inspection.
#[derive(Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<DelegateEvent>>,
}

impl RecordingDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DelegateEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn start_foreground_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, DelegateEvent::StartForeground(_)))
            .count()
    }

    pub fn notification_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, DelegateEvent::NotificationUpdate(_, _)))
            .count()
    }

    pub fn stop_service_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, DelegateEvent::StopService))
            .count()
    }

    pub fn vibrations(&self) -> Vec<ReminderKind> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                DelegateEvent::Vibrate(kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl TrackingDelegate for RecordingDelegate {
    async fn on_start_foreground(&self, session: &Session) {
        self.events
            .lock()
            .unwrap()
            .push(DelegateEvent::StartForeground(session.id.clone()));
    }

    async fn on_notification_update(&self, session: &Session, elapsed_ms: u64) {
        self.events
            .lock()
            .unwrap()
            .push(DelegateEvent::NotificationUpdate(
                session.id.clone(),
                elapsed_ms,
            ));
    }

    async fn on_stop_service(&self) {
        self.events.lock().unwrap().push(DelegateEvent::StopService);
    }

    async fn on_vibrate(&self, event: &ReminderEvent) {
        self.events
            .lock()
            .unwrap()
            .push(DelegateEvent::Vibrate(event.kind));
    }
}

/// Store wrapper that counts persist calls.
pub struct CountingStore {
    inner: MemorySessionStore,
    persists: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: MemorySessionStore::new(),
            persists: AtomicUsize::new(0),
        }
    }

    pub fn persist_count(&self) -> usize {
        self.persists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for CountingStore {
    async fn persist(&self, session: &Session) -> Result<(), TrackingError> {
        self.persists.fetch_add(1, Ordering::SeqCst);
        self.inner.persist(session).await
    }

    async fn get(&self, session_id: &str) -> Result<Session, TrackingError> {
        self.inner.get(session_id).await
    }

    async fn active_session(&self) -> Result<Option<Session>, TrackingError> {
        self.inner.active_session().await
    }

    async fn list_completed(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<SessionSummary>, TrackingError> {
        self.inner.list_completed(limit, offset).await
    }

    fn observe_active(&self) -> watch::Receiver<Option<Session>> {
        self.inner.observe_active()
    }
}

/// Builds a completed session with explicit aggregates for store and stats
/// tests.
pub fn completed_session(id: &str, started_at: DateTime<Utc>, elapsed_ms: u64) -> Session {
    let mut session = Session::begin(
        id.to_string(),
        None,
        &fix_at(52.5, 13.4, started_at),
        started_at,
    );
    session.elapsed_ms = elapsed_ms;
    session.status = SessionStatus::Completed;
    session.ended_at = Some(started_at + chrono::Duration::milliseconds(elapsed_ms as i64));
    session
}

/// Polls `cond` until it holds or the deadline passes.
pub async fn wait_until<F>(deadline_ms: u64, cond: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(deadline_ms);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

/// Polls the controller's active-session snapshot until `cond` holds.
pub async fn wait_for_session<F>(controller: &RideController, deadline_ms: u64, cond: F) -> bool
where
    F: Fn(&Option<Session>) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(deadline_ms);
    loop {
        let snapshot = controller.active_snapshot().await;
        if cond(&snapshot) {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
