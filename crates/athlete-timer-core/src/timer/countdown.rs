//! Countdown engine.
//!
//! A tick-driven state machine. It owns no thread or timer of its own: the
//! caller (usually [`SessionDriver`](super::SessionDriver)) invokes `tick()`
//! once per interval while the engine is running.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |
//!            v
//!        Completed
//! ```
//!
//! `reset()` puts any state back to `Idle` with a fresh duration. The session
//! runner uses it between sets and for preset switching.

use serde::{Deserialize, Serialize};

use crate::error::TimerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// What a single `tick()` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Engine was not running; nothing changed.
    Ignored,
    /// One second was counted off.
    Counted { remaining_secs: u32 },
    /// The countdown reached zero on this tick.
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownEngine {
    duration_secs: u32,
    remaining_secs: u32,
    state: TimerState,
    /// Set once the zero-crossing has been reported for this countdown.
    completion_signaled: bool,
}

impl CountdownEngine {
    /// Create an idle countdown of `duration_secs`.
    pub fn new(duration_secs: u32) -> Result<Self, TimerError> {
        if duration_secs == 0 {
            return Err(TimerError::InvalidDuration(duration_secs));
        }
        Ok(Self {
            duration_secs,
            remaining_secs: duration_secs,
            state: TimerState::Idle,
            completion_signaled: false,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.duration_secs - self.remaining_secs
    }

    /// 0.0 .. 1.0 progress through the current countdown.
    pub fn elapsed_ratio(&self) -> f64 {
        f64::from(self.elapsed_secs()) / f64::from(self.duration_secs)
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Idle/Paused -> Running. Returns `Ok(false)` if already running.
    pub fn resume(&mut self) -> Result<bool, TimerError> {
        match self.state {
            TimerState::Idle | TimerState::Paused => {
                self.state = TimerState::Running;
                Ok(true)
            }
            TimerState::Running => Ok(false),
            TimerState::Completed => Err(TimerError::InvalidTransition {
                op: "resume",
                state: self.state,
            }),
        }
    }

    /// Running -> Paused. Returns `Ok(false)` if there was nothing to pause.
    pub fn pause(&mut self) -> Result<bool, TimerError> {
        match self.state {
            TimerState::Running => {
                self.state = TimerState::Paused;
                Ok(true)
            }
            TimerState::Idle | TimerState::Paused => Ok(false),
            TimerState::Completed => Err(TimerError::InvalidTransition {
                op: "pause",
                state: self.state,
            }),
        }
    }

    /// Count off one second. Only has an effect while running.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != TimerState::Running {
            if self.completion_signaled {
                tracing::warn!(
                    error = %TimerError::DuplicateCompletion,
                    "tick delivered to a finished countdown"
                );
            }
            return TickOutcome::Ignored;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return TickOutcome::Counted {
                remaining_secs: self.remaining_secs,
            };
        }

        self.state = TimerState::Completed;
        self.completion_signaled = true;
        TickOutcome::Completed
    }

    /// Start over with a (possibly different) duration. State becomes Idle.
    pub fn reset(&mut self, duration_secs: u32) -> Result<(), TimerError> {
        if duration_secs == 0 {
            return Err(TimerError::InvalidDuration(duration_secs));
        }
        self.duration_secs = duration_secs;
        self.remaining_secs = duration_secs;
        self.state = TimerState::Idle;
        self.completion_signaled = false;
        Ok(())
    }
}
