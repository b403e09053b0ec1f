use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{SessionKind, SessionResult, SessionStatus};

/// Every state change of a session produces an Event.
/// The presentation layer renders them; the CLI prints them as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        kind: SessionKind,
        set_index: u32,
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    Ticked {
        set_index: u32,
        remaining_secs: u32,
        /// Index into the session's guidance lines, when it has any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        guidance_index: Option<usize>,
    },
    /// A non-final set reached zero; waiting for `advance_set`.
    SetCompleted {
        set_index: u32,
        total_sets: u32,
        at: DateTime<Utc>,
    },
    SetAdvanced {
        set_index: u32,
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    PresetSelected {
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    /// Final set reached zero naturally. Emitted at most once per session.
    SessionCompleted {
        kind: SessionKind,
        at: DateTime<Utc>,
    },
    /// Session finalized, either naturally or ended early by the user.
    SessionFinished {
        result: SessionResult,
    },
    StateSnapshot {
        kind: SessionKind,
        status: SessionStatus,
        set_index: u32,
        total_sets: u32,
        remaining_secs: u32,
        duration_secs: u32,
        elapsed_ratio: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        guidance: Option<String>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Whether this event ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::SessionCompleted { .. } | Event::SessionFinished { .. })
    }
}
