pub mod config;
pub mod controller;
pub mod creator;
pub mod loops;
pub mod worker;

pub use config::TrackingConfig;
pub use controller::RideController;
pub use creator::SessionCreator;
pub use worker::{TrackingDelegate, TrackingWorker};
