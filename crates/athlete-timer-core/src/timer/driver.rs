//! Real-time tick source for a [`SessionRunner`].
//!
//! The driver owns the runner behind a mutex and at most one Tokio task that
//! calls `tick()` once per interval. Every event the runner produces, from
//! controls or ticks, is forwarded on an unbounded channel.
//!
//! The tick task only lives while the session is running: pausing aborts it,
//! a finished set or session lets it exit, and `teardown()`/`Drop` abort it
//! unconditionally. A torn-down driver is closed for good: controls are
//! rejected and no further events are emitted. All methods that may start
//! ticking must be called from within a Tokio runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::countdown::TimerState;
use super::session::{SessionResult, SessionRunner};
use crate::error::TimerError;
use crate::events::Event;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

pub struct SessionDriver {
    runner: Arc<Mutex<SessionRunner>>,
    tick_interval: Duration,
    events: mpsc::UnboundedSender<Event>,
    ticker: Option<JoinHandle<()>>,
    torn_down: bool,
}

impl SessionDriver {
    pub fn new(
        runner: SessionRunner,
        tick_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (events, rx) = mpsc::unbounded_channel();
        let driver = Self {
            runner: Arc::new(Mutex::new(runner)),
            tick_interval,
            events,
            ticker: None,
            torn_down: false,
        };
        (driver, rx)
    }

    pub fn with_runner<R>(&self, f: impl FnOnce(&SessionRunner) -> R) -> R {
        f(&lock(&self.runner))
    }

    pub fn snapshot(&self) -> Event {
        lock(&self.runner).snapshot()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Start or resume. A call while already running leaves the existing
    /// tick source alone.
    pub fn resume(&mut self) -> Result<(), TimerError> {
        self.ensure_open("resume")?;
        let event = lock(&self.runner).resume()?;
        match event {
            Some(event) => {
                self.emit(event);
                self.restart_ticker();
            }
            None => tracing::debug!("already running; tick source unchanged"),
        }
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), TimerError> {
        self.ensure_open("pause")?;
        // The tick task sends while holding the lock, so once the state has
        // flipped here no Ticked event can follow TimerPaused.
        {
            let mut runner = lock(&self.runner);
            if let Some(event) = runner.pause()? {
                self.emit(event);
            }
        }
        self.stop_ticker();
        Ok(())
    }

    pub fn toggle(&mut self) -> Result<(), TimerError> {
        self.ensure_open("toggle")?;
        if lock(&self.runner).is_running() {
            self.pause()
        } else {
            self.resume()
        }
    }

    pub fn advance_set(&mut self) -> Result<(), TimerError> {
        self.ensure_open("advance_set")?;
        let event = lock(&self.runner).advance_set()?;
        self.emit(event);
        Ok(())
    }

    pub fn select_preset(&mut self, duration_secs: u32) -> Result<(), TimerError> {
        self.ensure_open("select_preset")?;
        let event = lock(&self.runner).select_preset(duration_secs)?;
        self.emit(event);
        self.restart_ticker();
        Ok(())
    }

    /// Stop ticking and finalize. Emits `SessionFinished` on the first call.
    /// After teardown there is nothing left to finalize.
    pub fn complete_session(&mut self, skipped_early: bool) -> Option<SessionResult> {
        if self.torn_down {
            tracing::warn!(
                error = %TimerError::DuplicateCompletion,
                "complete_session called on a torn-down driver"
            );
            return None;
        }
        self.stop_ticker();
        let result = lock(&self.runner).complete_session(skipped_early)?;
        self.emit(Event::SessionFinished {
            result: result.clone(),
        });
        Some(result)
    }

    /// Stop the tick source and close the driver. No events are produced
    /// after this returns.
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.stop_ticker();
        tracing::debug!("session driver torn down");
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ensure_open(&self, op: &'static str) -> Result<(), TimerError> {
        if !self.torn_down {
            return Ok(());
        }
        let err = TimerError::InvalidTransition {
            op,
            state: TimerState::Completed,
        };
        tracing::warn!(error = %err, "rejected control on torn-down driver");
        Err(err)
    }

    fn emit(&self, event: Event) {
        // Receiver gone means nobody is watching; the session still runs.
        let _ = self.events.send(event);
    }

    fn stop_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }

    fn restart_ticker(&mut self) {
        self.stop_ticker();
        let runner = Arc::clone(&self.runner);
        let events = self.events.clone();
        let period = self.tick_interval;

        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let mut guard = lock(&runner);
                for event in guard.tick() {
                    if events.send(event).is_err() {
                        return;
                    }
                }
                if !guard.is_running() {
                    break;
                }
            }
        }));
    }
}

impl Drop for SessionDriver {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

fn lock(runner: &Mutex<SessionRunner>) -> MutexGuard<'_, SessionRunner> {
    runner.lock().unwrap_or_else(PoisonError::into_inner)
}
