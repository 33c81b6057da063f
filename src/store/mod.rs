pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::TrackingError;
use crate::models::{Session, SessionSummary};

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

/// Durable home for sessions and their track points.
///
/// Implementations enforce the single-active invariant: persisting a running
/// or paused session while a different session is still active is rejected.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Writes the session's current state, including any track points not
    /// yet stored, and publishes the change on the active-session watch.
    async fn persist(&self, session: &Session) -> Result<(), TrackingError>;

    async fn get(&self, session_id: &str) -> Result<Session, TrackingError>;

    /// The running or paused session, if one exists.
    async fn active_session(&self) -> Result<Option<Session>, TrackingError>;

    /// Completed sessions, newest first, without track points.
    async fn list_completed(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<SessionSummary>, TrackingError>;

    /// Watch channel mirroring the active session. Holds `None` whenever no
    /// session is running or paused.
    fn observe_active(&self) -> watch::Receiver<Option<Session>>;
}
