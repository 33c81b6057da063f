use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReminderKind {
    Drink,
    Eat,
}

/// A nutrition cue emitted while a ride is in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderEvent {
    pub kind: ReminderKind,
    pub issued_at: DateTime<Utc>,
}

/// Fan-out source of nutrition reminders. Subscribers that fall behind skip
/// over lost events rather than stalling the sender.
pub trait NutritionReminderSource: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<ReminderEvent>;
}
