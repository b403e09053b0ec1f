//! Notification backend for a terminal session.
//!
//! Toasts go to stderr so stdout stays machine-readable. A terminal has no
//! OS scheduler, so daily reminders are only recorded in the log.

use athlete_timer_core::notify::{DailyTrigger, Notification, NotificationBackend};
use athlete_timer_core::NotifyError;
use uuid::Uuid;

pub struct TerminalBackend;

impl NotificationBackend for TerminalBackend {
    fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        eprintln!("** {}: {}", notification.title, notification.body);
        Ok(())
    }

    fn schedule_daily(&self, id: Uuid, trigger: &DailyTrigger) -> Result<(), NotifyError> {
        tracing::debug!(%id, kind = ?trigger.kind, time = %trigger.time, "reminder registered");
        Ok(())
    }

    fn cancel(&self, id: Uuid) -> Result<(), NotifyError> {
        tracing::debug!(%id, "reminder cancelled");
        Ok(())
    }
}
