use serde::{Deserialize, Serialize};

/// Derived statistics for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideStats {
    pub session_id: String,
    pub elapsed_ms: u64,
    pub traveled_km: f64,
    pub average_speed_kmh: f64,
    pub top_speed_kmh: f64,
    /// Time spent at or above the moving threshold, never above `elapsed_ms`.
    pub moving_ms: u64,
    /// Remainder of the elapsed time.
    pub idle_ms: u64,
    pub altitude_loss_m: f64,
    /// MET-based estimate; absent when the rider's weight is unknown.
    pub estimated_calories_kcal: Option<f64>,
}
