pub mod calculator;
pub mod config;
pub mod types;

pub use calculator::compute_stats;
pub use config::StatsConfig;
pub use types::RideStats;
