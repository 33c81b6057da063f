pub mod session;
pub mod track_point;

pub use session::{Destination, Session, SessionStatus, SessionSummary};
pub use track_point::TrackPoint;
