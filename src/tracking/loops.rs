use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::models::SessionStatus;
use crate::sources::{LocationSettingsSource, LocationSource, NutritionReminderSource};
use crate::tracking::worker::TrackingDelegate;
use crate::tracking::{RideController, TrackingConfig};

/// Polls the location source on a fixed cadence and feeds each fix to the
/// controller. Poll failures are logged and the next tick tries again.
pub async fn location_poll_loop(
    controller: RideController,
    location: Arc<dyn LocationSource>,
    config: TrackingConfig,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.location_poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match location.current_location().await {
                    Ok(fix) => {
                        if let Err(err) = controller.record_fix(fix).await {
                            warn!("Failed to record location fix: {err}");
                        }
                    }
                    Err(err) => warn!("Location poll failed: {err}"),
                }
            }
            _ = cancel_token.cancelled() => {
                info!("Location loop shutting down");
                break;
            }
        }
    }
}

/// Pushes the current elapsed time to the delegate once a second while the
/// session runs. Reads only; the session is never persisted from here.
pub async fn elapsed_report_loop(
    controller: RideController,
    delegate: Arc<dyn TrackingDelegate>,
    config: TrackingConfig,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.elapsed_report_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(session) = controller.active_snapshot().await {
                    if session.status == SessionStatus::Running {
                        let elapsed_ms = session.elapsed_now(Utc::now());
                        delegate.on_notification_update(&session, elapsed_ms).await;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                info!("Elapsed report loop shutting down");
                break;
            }
        }
    }
}

/// Watches the location-services toggle and pauses the ride when it flips
/// off. The initial state is checked once before watching for changes.
pub async fn settings_monitor_loop(
    controller: RideController,
    settings: Arc<dyn LocationSettingsSource>,
    cancel_token: CancellationToken,
) {
    match settings.is_enabled().await {
        Ok(false) => {
            info!("Location services disabled, pausing session");
            if let Err(err) = controller.pause().await {
                warn!("Failed to pause session: {err}");
            }
        }
        Ok(true) => {}
        Err(err) => warn!("Location settings check failed: {err}"),
    }

    let mut enabled_rx = settings.observe_enabled();
    loop {
        tokio::select! {
            changed = enabled_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let enabled = *enabled_rx.borrow_and_update();
                if !enabled {
                    info!("Location services disabled, pausing session");
                    if let Err(err) = controller.pause().await {
                        warn!("Failed to pause session: {err}");
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                info!("Settings monitor shutting down");
                break;
            }
        }
    }
}

/// Relays nutrition reminders to the delegate. A lagged receiver skips the
/// missed events and keeps listening.
pub async fn reminder_relay_loop(
    reminders: Arc<dyn NutritionReminderSource>,
    delegate: Arc<dyn TrackingDelegate>,
    cancel_token: CancellationToken,
) {
    let mut events = reminders.subscribe();
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => delegate.on_vibrate(&event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Reminder stream lagged, skipped {skipped} events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            _ = cancel_token.cancelled() => {
                info!("Reminder relay shutting down");
                break;
            }
        }
    }
}
