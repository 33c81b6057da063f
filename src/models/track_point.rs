use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::sources::LocationFix;

/// One recorded position fix with its derived instantaneous speed.
///
/// A point flagged as segment start opens a new stretch of continuous
/// tracking (the first point of a session, or the first fix after a process
/// restart); distance and speed are never computed across that boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPoint {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
    pub speed_kmh: f64,
    pub altitude_m: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub is_segment_start: bool,
}

impl TrackPoint {
    pub fn from_fix(fix: &LocationFix, speed_kmh: f64, is_segment_start: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            latitude: fix.latitude,
            longitude: fix.longitude,
            recorded_at: fix.recorded_at,
            speed_kmh,
            altitude_m: fix.altitude_m,
            accuracy_m: fix.accuracy_m,
            is_segment_start,
        }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}
