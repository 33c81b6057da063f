use thiserror::Error;

/// Failure taxonomy of the tracking engine. Every public operation returns
/// these; redundant state transitions are not errors but no-op successes
/// (see the controller).
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("no active session")]
    NoActiveSession,

    #[error("no location fix could be obtained")]
    LocationUnavailable,

    #[error("session {0} not found")]
    SessionNotFound(String),

    #[error("persistence failed: {0}")]
    Persistence(anyhow::Error),
}

impl From<anyhow::Error> for TrackingError {
    fn from(err: anyhow::Error) -> Self {
        TrackingError::Persistence(err)
    }
}
