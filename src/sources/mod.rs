pub mod location;
pub mod profile;
pub mod reminders;

pub use location::{LocationFix, LocationSettingsSource, LocationSource};
pub use profile::{FileRiderProfile, RiderProfile, RiderProfileSource};
pub use reminders::{NutritionReminderSource, ReminderEvent, ReminderKind};
