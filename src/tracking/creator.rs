use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use tokio::time;
use uuid::Uuid;

use crate::error::TrackingError;
use crate::models::{Destination, Session};
use crate::sources::{LocationFix, LocationSource};
use crate::tracking::TrackingConfig;

/// Builds new sessions from an initial location fix.
///
/// The location source gets a fixed number of attempts. The first fix inside
/// the accuracy threshold wins immediately; if no attempt qualifies, the last
/// fix obtained is used anyway, and only a total blackout is an error.
#[derive(Clone)]
pub struct SessionCreator {
    location: Arc<dyn LocationSource>,
    config: TrackingConfig,
}

impl SessionCreator {
    pub fn new(location: Arc<dyn LocationSource>, config: TrackingConfig) -> Self {
        Self { location, config }
    }

    pub async fn create_session(
        &self,
        destination: Option<Destination>,
    ) -> Result<Session, TrackingError> {
        let fix = self.acquire_start_fix().await?;
        let session_id = Uuid::new_v4().to_string();
        let session = Session::begin(session_id, destination, &fix, Utc::now());
        info!(
            "Created session {} at ({:.5}, {:.5})",
            session.id, fix.latitude, fix.longitude
        );
        Ok(session)
    }

    async fn acquire_start_fix(&self) -> Result<LocationFix, TrackingError> {
        let mut last_fix: Option<LocationFix> = None;

        for attempt in 1..=self.config.creation_attempts {
            match self.location.current_location().await {
                Ok(fix) if fix.is_within_accuracy(self.config.max_accuracy_m) => {
                    return Ok(fix);
                }
                Ok(fix) => {
                    warn!(
                        "Start fix attempt {attempt} has poor accuracy ({:?} m)",
                        fix.accuracy_m
                    );
                    last_fix = Some(fix);
                }
                Err(err) => {
                    warn!("Start fix attempt {attempt} failed: {err}");
                }
            }

            if attempt < self.config.creation_attempts {
                time::sleep(self.config.creation_retry_delay).await;
            }
        }

        last_fix.ok_or(TrackingError::LocationUnavailable)
    }
}
