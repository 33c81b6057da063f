/// Thresholds for the derived-statistics pass.
#[derive(Debug, Clone, Copy)]
pub struct StatsConfig {
    /// Below this instantaneous speed a stretch counts as idle time.
    pub moving_speed_threshold_kmh: f64,
    /// Altitude drops at or below this are treated as sensor noise.
    pub altitude_noise_threshold_m: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            moving_speed_threshold_kmh: 2.0,
            altitude_noise_threshold_m: 1.0,
        }
    }
}
