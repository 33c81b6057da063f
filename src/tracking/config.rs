use std::time::Duration;

use crate::geo::{haversine_distance_km, DistanceFn};

/// Tuning knobs for session creation and the tracking loops. Tests shrink
/// the intervals and swap the distance function for a deterministic one.
#[derive(Debug, Clone, Copy)]
pub struct TrackingConfig {
    /// How often the location source is polled while a ride is running.
    pub location_poll_interval: Duration,
    /// How often the delegate receives an elapsed-time notification update.
    pub elapsed_report_interval: Duration,
    /// Location attempts made before session creation gives up.
    pub creation_attempts: u32,
    /// Delay between those attempts.
    pub creation_retry_delay: Duration,
    /// Worst accuracy radius accepted for a session's starting fix.
    pub max_accuracy_m: f64,
    pub distance_fn: DistanceFn,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            location_poll_interval: Duration::from_secs(5),
            elapsed_report_interval: Duration::from_secs(1),
            creation_attempts: 3,
            creation_retry_delay: Duration::from_secs(2),
            max_accuracy_m: 20.0,
            distance_fn: haversine_distance_km,
        }
    }
}
