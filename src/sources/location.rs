use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

use crate::geo::GeoPoint;

/// A raw position report from the platform location service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl LocationFix {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// A fix qualifies only when it reports an accuracy radius at or below
    /// the threshold. Fixes without an accuracy estimate never qualify.
    pub fn is_within_accuracy(&self, max_accuracy_m: f64) -> bool {
        self.accuracy_m.is_some_and(|a| a <= max_accuracy_m)
    }
}

/// Provider of the device position, pollable and observable.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_location(&self) -> Result<LocationFix>;

    /// Broadcast feed of fixes as the platform produces them. Subscribers
    /// see fixes observed after they subscribe.
    fn observe(&self) -> broadcast::Receiver<LocationFix>;
}

/// Reports whether location services are switched on for the app.
#[async_trait]
pub trait LocationSettingsSource: Send + Sync {
    async fn is_enabled(&self) -> Result<bool>;

    /// Watch channel carrying the latest enabled state. Subscribers see the
    /// current value immediately and every change after it.
    fn observe_enabled(&self) -> watch::Receiver<bool>;
}
