pub mod db;
pub mod error;
pub mod geo;
pub mod models;
pub mod sources;
pub mod stats;
pub mod store;
pub mod tracking;

pub use error::TrackingError;
pub use geo::{haversine_distance_km, DistanceFn, GeoPoint};
pub use models::{Destination, Session, SessionStatus, SessionSummary, TrackPoint};
pub use sources::{
    FileRiderProfile, LocationFix, LocationSettingsSource, LocationSource,
    NutritionReminderSource, ReminderEvent, ReminderKind, RiderProfile, RiderProfileSource,
};
pub use stats::{compute_stats, RideStats, StatsConfig};
pub use store::{MemorySessionStore, SessionStore, SqliteSessionStore};
pub use tracking::{
    RideController, SessionCreator, TrackingConfig, TrackingDelegate, TrackingWorker,
};
