//! Notification center.
//!
//! An explicitly constructed service owned by the application root. `init()`
//! schedules the daily reminders with the platform backend and enables
//! in-app toasts; `teardown()` cancels everything it scheduled. Dropping an
//! initialized center tears it down.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::reminders::DailyTrigger;
use crate::error::NotifyError;
use crate::events::Event;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Platform notification API.
pub trait NotificationBackend {
    /// Show a notification now.
    fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Register a repeating daily notification under `id`.
    fn schedule_daily(&self, id: Uuid, trigger: &DailyTrigger) -> Result<(), NotifyError>;

    fn cancel(&self, id: Uuid) -> Result<(), NotifyError>;
}

pub struct NotificationCenter<B: NotificationBackend> {
    backend: B,
    scheduled: Vec<(Uuid, DailyTrigger)>,
    initialized: bool,
}

impl<B: NotificationBackend> NotificationCenter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            scheduled: Vec::new(),
            initialized: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn scheduled(&self) -> &[(Uuid, DailyTrigger)] {
        &self.scheduled
    }

    /// Schedule `triggers` and start accepting notifications. Calling it
    /// again replaces the previous schedule.
    pub fn init(&mut self, triggers: Vec<DailyTrigger>) -> Result<(), NotifyError> {
        if self.initialized {
            self.teardown()?;
        }
        for trigger in triggers {
            let id = Uuid::new_v4();
            self.backend.schedule_daily(id, &trigger)?;
            tracing::debug!(%id, kind = ?trigger.kind, time = %trigger.time, "daily reminder scheduled");
            self.scheduled.push((id, trigger));
        }
        self.initialized = true;
        Ok(())
    }

    pub fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        if !self.initialized {
            return Err(NotifyError::NotInitialized);
        }
        self.backend.deliver(&Notification {
            title: title.to_string(),
            body: body.to_string(),
        })
    }

    /// Toast for a session event, if the event deserves one.
    pub fn notify_event(&self, event: &Event) -> Result<(), NotifyError> {
        match session_notification(event) {
            Some(n) => self.notify(&n.title, &n.body),
            None => Ok(()),
        }
    }

    /// Cancel all scheduled reminders and stop accepting notifications.
    ///
    /// Every reminder gets a cancel attempt. Those the backend failed to
    /// cancel stay in `scheduled()` and the first failure is returned, so a
    /// later teardown retries them.
    pub fn teardown(&mut self) -> Result<(), NotifyError> {
        self.initialized = false;
        let backend = &self.backend;
        let mut failure = None;
        self.scheduled.retain(|(id, _)| match backend.cancel(*id) {
            Ok(()) => false,
            Err(e) => {
                tracing::warn!(%id, error = %e, "reminder cancel failed");
                failure.get_or_insert(e);
                true
            }
        });
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<B: NotificationBackend> Drop for NotificationCenter<B> {
    fn drop(&mut self) {
        if self.initialized || !self.scheduled.is_empty() {
            if let Err(e) = self.teardown() {
                tracing::warn!(error = %e, "notification teardown failed");
            }
        }
    }
}

pub fn session_notification(event: &Event) -> Option<Notification> {
    match event {
        Event::SetCompleted {
            set_index,
            total_sets,
            ..
        } => Some(Notification {
            title: format!("Set {set_index} of {total_sets} done"),
            body: "Take a breath, then start the next set.".into(),
        }),
        Event::SessionCompleted { kind, .. } => Some(Notification {
            title: "Session complete".into(),
            body: match kind {
                crate::timer::SessionKind::Rest => "Rest is over. Back to work!".into(),
                crate::timer::SessionKind::Meditation => "Nice work staying present.".into(),
                crate::timer::SessionKind::PtExercise => "PT exercise logged. Great consistency!".into(),
            },
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::daily_triggers;
    use crate::storage::ReminderConfig;
    use crate::timer::SessionKind;
    use chrono::Utc;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        delivered: Vec<Notification>,
        scheduled: Vec<Uuid>,
        cancelled: Vec<Uuid>,
        refuse_cancel: Option<Uuid>,
    }

    #[derive(Clone, Default)]
    struct RecordingBackend(Rc<RefCell<Log>>);

    impl NotificationBackend for RecordingBackend {
        fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.0.borrow_mut().delivered.push(notification.clone());
            Ok(())
        }

        fn schedule_daily(&self, id: Uuid, _trigger: &DailyTrigger) -> Result<(), NotifyError> {
            self.0.borrow_mut().scheduled.push(id);
            Ok(())
        }

        fn cancel(&self, id: Uuid) -> Result<(), NotifyError> {
            let mut log = self.0.borrow_mut();
            if log.refuse_cancel == Some(id) {
                return Err(NotifyError::Backend("cancel refused".into()));
            }
            log.cancelled.push(id);
            Ok(())
        }
    }

    #[test]
    fn notify_requires_init() {
        let center = NotificationCenter::new(RecordingBackend::default());
        assert!(matches!(
            center.notify("hi", "there"),
            Err(NotifyError::NotInitialized)
        ));
    }

    #[test]
    fn init_schedules_and_teardown_cancels() {
        let backend = RecordingBackend::default();
        let log = Rc::clone(&backend.0);
        let mut center = NotificationCenter::new(backend);
        center
            .init(daily_triggers(&ReminderConfig::default()).unwrap())
            .unwrap();
        assert_eq!(log.borrow().scheduled.len(), 3);

        center.notify("Rest", "over").unwrap();
        assert_eq!(log.borrow().delivered.len(), 1);

        center.teardown().unwrap();
        assert_eq!(log.borrow().cancelled.len(), 3);
        assert!(center.notify("again", "no").is_err());
    }

    #[test]
    fn drop_tears_down() {
        let backend = RecordingBackend::default();
        let log = Rc::clone(&backend.0);
        {
            let mut center = NotificationCenter::new(backend);
            center
                .init(daily_triggers(&ReminderConfig::default()).unwrap())
                .unwrap();
        }
        let log = log.borrow();
        assert_eq!(log.cancelled.len(), log.scheduled.len());
    }

    #[test]
    fn failed_cancel_is_kept_for_retry() {
        let backend = RecordingBackend::default();
        let log = Rc::clone(&backend.0);
        let mut center = NotificationCenter::new(backend);
        center
            .init(daily_triggers(&ReminderConfig::default()).unwrap())
            .unwrap();
        let stuck = center.scheduled()[1].0;
        log.borrow_mut().refuse_cancel = Some(stuck);

        assert!(matches!(center.teardown(), Err(NotifyError::Backend(_))));
        assert_eq!(log.borrow().cancelled.len(), 2);
        assert_eq!(center.scheduled().len(), 1);
        assert_eq!(center.scheduled()[0].0, stuck);

        log.borrow_mut().refuse_cancel = None;
        center.teardown().unwrap();
        assert!(center.scheduled().is_empty());
        assert!(log.borrow().cancelled.contains(&stuck));
    }

    #[test]
    fn reinit_replaces_schedule() {
        let backend = RecordingBackend::default();
        let log = Rc::clone(&backend.0);
        let mut center = NotificationCenter::new(backend);
        let triggers = daily_triggers(&ReminderConfig::default()).unwrap();
        center.init(triggers.clone()).unwrap();
        center.init(triggers).unwrap();
        assert_eq!(center.scheduled().len(), 3);
        assert_eq!(log.borrow().cancelled.len(), 3);
    }

    #[test]
    fn only_completion_events_toast() {
        let backend = RecordingBackend::default();
        let log = Rc::clone(&backend.0);
        let mut center = NotificationCenter::new(backend);
        center.init(Vec::new()).unwrap();

        center
            .notify_event(&Event::TimerPaused {
                remaining_secs: 3,
                at: Utc::now(),
            })
            .unwrap();
        center
            .notify_event(&Event::SessionCompleted {
                kind: SessionKind::Rest,
                at: Utc::now(),
            })
            .unwrap();
        let log = log.borrow();
        assert_eq!(log.delivered.len(), 1);
        assert_eq!(log.delivered[0].title, "Session complete");
    }
}
