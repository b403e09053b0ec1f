mod center;
mod reminders;

pub use center::{session_notification, Notification, NotificationBackend, NotificationCenter};
pub use reminders::{daily_triggers, DailyTrigger, ReminderKind};
