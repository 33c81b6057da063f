use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::TrackingError;
use crate::models::{Session, SessionStatus};
use crate::sources::{
    LocationSettingsSource, LocationSource, NutritionReminderSource, ReminderEvent,
};
use crate::tracking::loops::{
    elapsed_report_loop, location_poll_loop, reminder_relay_loop, settings_monitor_loop,
};
use crate::tracking::{RideController, TrackingConfig};

/// Platform-facing callbacks driven by the tracking worker.
#[async_trait]
pub trait TrackingDelegate: Send + Sync {
    /// A running session needs the foreground service and its notification.
    async fn on_start_foreground(&self, session: &Session);
    /// Refresh the ongoing notification with the current elapsed time.
    async fn on_notification_update(&self, session: &Session, elapsed_ms: u64);
    /// No session is active anymore; the service and notification go away.
    async fn on_stop_service(&self);
    /// A nutrition reminder fired mid-ride.
    async fn on_vibrate(&self, event: &ReminderEvent);
}

struct LoopSet {
    cancel_token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl LoopSet {
    async fn shutdown(self) {
        self.cancel_token.cancel();
        for handle in self.handles {
            if let Err(err) = handle.await {
                error!("Tracking loop task failed to join: {err:?}");
            }
        }
    }
}

#[derive(Clone)]
struct LoopContext {
    controller: RideController,
    location: Arc<dyn LocationSource>,
    settings: Arc<dyn LocationSettingsSource>,
    reminders: Arc<dyn NutritionReminderSource>,
    delegate: Arc<dyn TrackingDelegate>,
    config: TrackingConfig,
}

impl LoopContext {
    fn spawn_loops(&self, parent: &CancellationToken) -> LoopSet {
        let cancel_token = parent.child_token();
        let handles = vec![
            tokio::spawn(location_poll_loop(
                self.controller.clone(),
                self.location.clone(),
                self.config,
                cancel_token.clone(),
            )),
            tokio::spawn(elapsed_report_loop(
                self.controller.clone(),
                self.delegate.clone(),
                self.config,
                cancel_token.clone(),
            )),
            tokio::spawn(settings_monitor_loop(
                self.controller.clone(),
                self.settings.clone(),
                cancel_token.clone(),
            )),
        ];
        LoopSet {
            cancel_token,
            handles,
        }
    }
}

/// Drives the tracking loops from the active-session watch.
///
/// While a session runs, three tasks are live: location polling, elapsed
/// reporting, and the location-settings monitor. Pausing tears them down and
/// leaves one frozen notification update; completion tears them down and
/// releases the delegate's service. The reminder relay is a separate side
/// channel that lives for the worker's whole lifetime.
pub struct TrackingWorker {
    context: LoopContext,
    state: Mutex<WorkerState>,
}

struct WorkerState {
    root_token: Option<CancellationToken>,
    observer: Option<JoinHandle<()>>,
}

impl TrackingWorker {
    pub fn new(
        controller: RideController,
        location: Arc<dyn LocationSource>,
        settings: Arc<dyn LocationSettingsSource>,
        reminders: Arc<dyn NutritionReminderSource>,
        delegate: Arc<dyn TrackingDelegate>,
        config: TrackingConfig,
    ) -> Self {
        Self {
            context: LoopContext {
                controller,
                location,
                settings,
                reminders,
                delegate,
                config,
            },
            state: Mutex::new(WorkerState {
                root_token: None,
                observer: None,
            }),
        }
    }

    /// Spawns the session observer. Calling start on a worker that is
    /// already running is a no-op.
    pub async fn start(&self) {
        let mut state = self.state.lock().await;
        if state.observer.is_some() {
            return;
        }

        let root_token = CancellationToken::new();
        let sessions = self.context.controller.observe_active();
        let observer = tokio::spawn(observe_sessions(
            self.context.clone(),
            sessions,
            root_token.clone(),
        ));

        state.root_token = Some(root_token);
        state.observer = Some(observer);
    }

    /// Cancels the observer and every loop under it, waiting for all of
    /// them to finish.
    pub async fn stop(&self) {
        let (root_token, observer) = {
            let mut state = self.state.lock().await;
            (state.root_token.take(), state.observer.take())
        };

        if let Some(token) = root_token {
            token.cancel();
        }
        if let Some(handle) = observer {
            if let Err(err) = handle.await {
                error!("Session observer failed to join: {err:?}");
            }
            info!("Tracking worker stopped");
        }
    }

    /// Reconnects tracking after a process restart. A surviving session is
    /// flagged so its next fix opens a new segment, then the observer comes
    /// back up; with nothing to recover the delegate is told to clear any
    /// leftover service state.
    pub async fn handle_restart(&self) -> Result<(), TrackingError> {
        match self.context.controller.active_snapshot().await {
            Some(session) => {
                info!("Recovering session {} after restart", session.id);
                self.context.controller.on_service_restart().await?;
                self.start().await;
                Ok(())
            }
            None => {
                self.context.delegate.on_stop_service().await;
                Ok(())
            }
        }
    }
}

async fn observe_sessions(
    ctx: LoopContext,
    mut sessions: watch::Receiver<Option<Session>>,
    root_token: CancellationToken,
) {
    let relay_token = root_token.child_token();
    let relay = tokio::spawn(reminder_relay_loop(
        ctx.reminders.clone(),
        ctx.delegate.clone(),
        relay_token.clone(),
    ));

    let mut loops: Option<LoopSet> = None;
    let mut engaged = false;

    loop {
        let current = sessions.borrow_and_update().clone();
        match current {
            Some(session) if session.status == SessionStatus::Running => {
                engaged = true;
                if loops.is_none() {
                    info!("Starting tracking loops for session {}", session.id);
                    ctx.delegate.on_start_foreground(&session).await;
                    loops = Some(ctx.spawn_loops(&root_token));
                }
            }
            Some(session) if session.status == SessionStatus::Paused => {
                // A paused survivor still needs the service and its
                // notification brought up on first attach.
                if !engaged {
                    ctx.delegate.on_start_foreground(&session).await;
                }
                engaged = true;
                if let Some(set) = loops.take() {
                    set.shutdown().await;
                }
                ctx.delegate
                    .on_notification_update(&session, session.elapsed_ms)
                    .await;
            }
            _ => {
                if let Some(set) = loops.take() {
                    set.shutdown().await;
                }
                if engaged {
                    ctx.delegate.on_stop_service().await;
                    engaged = false;
                }
            }
        }

        tokio::select! {
            changed = sessions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = root_token.cancelled() => break,
        }
    }

    if let Some(set) = loops.take() {
        set.shutdown().await;
    }
    relay_token.cancel();
    if let Err(err) = relay.await {
        error!("Reminder relay task failed to join: {err:?}");
    }
}
