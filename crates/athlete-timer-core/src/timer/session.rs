//! Session runner.
//!
//! Wraps a [`CountdownEngine`] with the concerns shared by the rest timer,
//! the meditation timer and the PT exercise timer: repeated sets, guidance
//! lines keyed to progress, and a one-shot [`SessionResult`] handed to a
//! [`SessionSink`] when the session ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::countdown::{CountdownEngine, TickOutcome, TimerState};
use crate::error::{SubmitError, TimerError};
use crate::events::Event;
use crate::sink::SessionSink;
use crate::templates::SessionTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Rest,
    Meditation,
    PtExercise,
}

impl SessionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Rest => "rest",
            SessionKind::Meditation => "meditation",
            SessionKind::PtExercise => "pt_exercise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rest" => Some(SessionKind::Rest),
            "meditation" => Some(SessionKind::Meditation),
            "pt_exercise" | "pt" => Some(SessionKind::PtExercise),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session-level status.
///
/// `SetComplete` is the between-sets state of a multi-set session: the
/// current set reached zero and the runner waits for `advance_set()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
    SetComplete,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub kind: SessionKind,
    pub sets_completed: u32,
    pub total_sets: u32,
    pub total_elapsed_secs: u64,
    pub skipped_early: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Highlighted step for a progress ratio: `floor(ratio * step_count)`,
/// clamped to `[0, step_count - 1]`.
///
/// Ratios outside `[0, 1]` are clamped and NaN counts as 0. With no steps
/// the result is 0.
pub fn guidance_index_for(elapsed_ratio: f64, step_count: usize) -> usize {
    if step_count == 0 {
        return 0;
    }
    let ratio = if elapsed_ratio.is_nan() {
        0.0
    } else {
        elapsed_ratio.clamp(0.0, 1.0)
    };
    let idx = (ratio * step_count as f64).floor() as usize;
    idx.min(step_count - 1)
}

#[derive(Debug, Clone)]
pub struct SessionRunner {
    kind: SessionKind,
    engine: CountdownEngine,
    set_duration_secs: u32,
    current_set: u32,
    total_sets: u32,
    sets_completed: u32,
    /// Seconds counted in sets that already reached zero.
    completed_elapsed_secs: u64,
    guidance: Vec<String>,
    presets: Vec<u32>,
    started_at: Option<DateTime<Utc>>,
    finished: bool,
    naturally_completed: bool,
    result_emitted: bool,
}

impl SessionRunner {
    pub fn new(kind: SessionKind, set_duration_secs: u32, total_sets: u32) -> Result<Self, TimerError> {
        if total_sets == 0 {
            return Err(TimerError::InvalidDuration(total_sets));
        }
        Ok(Self {
            kind,
            engine: CountdownEngine::new(set_duration_secs)?,
            set_duration_secs,
            current_set: 1,
            total_sets,
            sets_completed: 0,
            completed_elapsed_secs: 0,
            guidance: Vec::new(),
            presets: Vec::new(),
            started_at: None,
            finished: false,
            naturally_completed: false,
            result_emitted: false,
        })
    }

    pub fn from_template(template: &SessionTemplate) -> Result<Self, TimerError> {
        Ok(Self::new(template.kind, template.set_duration_secs, template.total_sets)?
            .with_guidance(template.guidance.iter().map(|s| s.to_string()))
            .with_presets(template.presets.iter().copied()))
    }

    pub fn with_guidance<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.guidance = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_presets<I: IntoIterator<Item = u32>>(mut self, presets: I) -> Self {
        self.presets = presets.into_iter().filter(|&p| p > 0).collect();
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn status(&self) -> SessionStatus {
        if self.finished {
            return SessionStatus::Completed;
        }
        match self.engine.state() {
            TimerState::Idle => SessionStatus::Idle,
            TimerState::Running => SessionStatus::Running,
            TimerState::Paused => SessionStatus::Paused,
            TimerState::Completed => SessionStatus::SetComplete,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status() == SessionStatus::Running
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn remaining_secs(&self) -> u32 {
        self.engine.remaining_secs()
    }

    pub fn duration_secs(&self) -> u32 {
        self.engine.duration_secs()
    }

    pub fn current_set(&self) -> u32 {
        self.current_set
    }

    pub fn total_sets(&self) -> u32 {
        self.total_sets
    }

    pub fn sets_completed(&self) -> u32 {
        self.sets_completed
    }

    pub fn elapsed_ratio(&self) -> f64 {
        self.engine.elapsed_ratio()
    }

    pub fn presets(&self) -> &[u32] {
        &self.presets
    }

    pub fn guidance(&self) -> &[String] {
        &self.guidance
    }

    pub fn total_elapsed_secs(&self) -> u64 {
        let in_progress = if self.engine.state() == TimerState::Completed {
            0
        } else {
            u64::from(self.engine.elapsed_secs())
        };
        self.completed_elapsed_secs + in_progress
    }

    pub fn current_guidance_index(&self) -> Option<usize> {
        if self.guidance.is_empty() {
            return None;
        }
        Some(guidance_index_for(self.elapsed_ratio(), self.guidance.len()))
    }

    pub fn current_guidance(&self) -> Option<&str> {
        self.current_guidance_index()
            .and_then(|i| self.guidance.get(i))
            .map(String::as_str)
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            kind: self.kind,
            status: self.status(),
            set_index: self.current_set,
            total_sets: self.total_sets,
            remaining_secs: self.remaining_secs(),
            duration_secs: self.duration_secs(),
            elapsed_ratio: self.elapsed_ratio(),
            guidance: self.current_guidance().map(str::to_string),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or resume the current set. `Ok(None)` if already running.
    pub fn resume(&mut self) -> Result<Option<Event>, TimerError> {
        self.ensure_open("resume")?;
        let was_idle = self.engine.state() == TimerState::Idle;
        if !self.engine.resume()? {
            return Ok(None);
        }
        let now = Utc::now();
        self.started_at.get_or_insert(now);
        if was_idle {
            Ok(Some(Event::TimerStarted {
                kind: self.kind,
                set_index: self.current_set,
                duration_secs: self.engine.duration_secs(),
                at: now,
            }))
        } else {
            Ok(Some(Event::TimerResumed {
                remaining_secs: self.engine.remaining_secs(),
                at: now,
            }))
        }
    }

    /// Pause the current set. `Ok(None)` if it wasn't running.
    pub fn pause(&mut self) -> Result<Option<Event>, TimerError> {
        self.ensure_open("pause")?;
        if !self.engine.pause()? {
            return Ok(None);
        }
        Ok(Some(Event::TimerPaused {
            remaining_secs: self.engine.remaining_secs(),
            at: Utc::now(),
        }))
    }

    /// Advance by one tick interval. Returns the events it produced.
    pub fn tick(&mut self) -> Vec<Event> {
        if self.finished {
            return Vec::new();
        }
        match self.engine.tick() {
            TickOutcome::Ignored => Vec::new(),
            TickOutcome::Counted { remaining_secs } => vec![Event::Ticked {
                set_index: self.current_set,
                remaining_secs,
                guidance_index: self.current_guidance_index(),
            }],
            TickOutcome::Completed => self.on_set_completed(),
        }
    }

    /// Move to the next set once the current one reached zero.
    pub fn advance_set(&mut self) -> Result<Event, TimerError> {
        self.ensure_open("advance_set")?;
        let state = self.engine.state();
        if state != TimerState::Completed || self.current_set >= self.total_sets {
            return Err(TimerError::InvalidTransition {
                op: "advance_set",
                state,
            });
        }
        self.engine.reset(self.set_duration_secs)?;
        self.current_set += 1;
        tracing::debug!(kind = %self.kind, set = self.current_set, "advanced to next set");
        Ok(Event::SetAdvanced {
            set_index: self.current_set,
            duration_secs: self.set_duration_secs,
            at: Utc::now(),
        })
    }

    /// Restart the current set at `duration_secs` and keep it running.
    ///
    /// Time already counted in this set is discarded. The new duration also
    /// applies to later sets.
    pub fn select_preset(&mut self, duration_secs: u32) -> Result<Event, TimerError> {
        self.ensure_open("select_preset")?;
        if self.engine.state() == TimerState::Completed {
            return Err(TimerError::InvalidTransition {
                op: "select_preset",
                state: TimerState::Completed,
            });
        }
        self.engine.reset(duration_secs)?;
        self.set_duration_secs = duration_secs;
        self.engine.resume()?;
        let now = Utc::now();
        self.started_at.get_or_insert(now);
        Ok(Event::PresetSelected {
            duration_secs,
            at: now,
        })
    }

    /// Finalize the session and produce its result.
    ///
    /// The first call wins. Later calls return `None`; the duplicate is
    /// logged, not raised.
    pub fn complete_session(&mut self, skipped_early: bool) -> Option<SessionResult> {
        if self.result_emitted {
            tracing::warn!(
                error = %TimerError::DuplicateCompletion,
                kind = %self.kind,
                "complete_session called on a finalized session"
            );
            return None;
        }
        let now = Utc::now();
        let result = SessionResult {
            kind: self.kind,
            sets_completed: self.sets_completed,
            total_sets: self.total_sets,
            total_elapsed_secs: self.total_elapsed_secs(),
            skipped_early: skipped_early || !self.naturally_completed,
            started_at: self.started_at.unwrap_or(now),
            finished_at: now,
        };
        self.finished = true;
        self.result_emitted = true;
        tracing::info!(
            kind = %self.kind,
            sets = result.sets_completed,
            elapsed_secs = result.total_elapsed_secs,
            skipped_early = result.skipped_early,
            "session finalized"
        );
        Some(result)
    }

    /// Finalize and hand the result to `sink`.
    pub fn complete_and_submit(
        &mut self,
        skipped_early: bool,
        sink: &dyn SessionSink,
    ) -> Result<Option<SessionResult>, SubmitError> {
        let Some(result) = self.complete_session(skipped_early) else {
            return Ok(None);
        };
        sink.submit_session_result(self.kind, &result)?;
        Ok(Some(result))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ensure_open(&self, op: &'static str) -> Result<(), TimerError> {
        if self.finished {
            let err = TimerError::InvalidTransition {
                op,
                state: TimerState::Completed,
            };
            tracing::warn!(error = %err, kind = %self.kind, "rejected control on finished session");
            return Err(err);
        }
        Ok(())
    }

    fn on_set_completed(&mut self) -> Vec<Event> {
        let now = Utc::now();
        self.sets_completed += 1;
        self.completed_elapsed_secs += u64::from(self.engine.duration_secs());

        let mut events = vec![Event::Ticked {
            set_index: self.current_set,
            remaining_secs: 0,
            guidance_index: self.current_guidance_index(),
        }];
        if self.current_set < self.total_sets {
            events.push(Event::SetCompleted {
                set_index: self.current_set,
                total_sets: self.total_sets,
                at: now,
            });
        } else {
            self.finished = true;
            self.naturally_completed = true;
            events.push(Event::SessionCompleted {
                kind: self.kind,
                at: now,
            });
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use proptest::prelude::*;

    fn tick_n(runner: &mut SessionRunner, n: u32) -> Vec<Event> {
        (0..n).flat_map(|_| runner.tick()).collect()
    }

    #[test]
    fn zero_sets_rejected() {
        assert_eq!(
            SessionRunner::new(SessionKind::PtExercise, 30, 0).unwrap_err(),
            TimerError::InvalidDuration(0)
        );
    }

    #[test]
    fn single_set_completes_naturally() {
        let mut runner = SessionRunner::new(SessionKind::Rest, 3, 1).unwrap();
        assert!(matches!(runner.resume().unwrap(), Some(Event::TimerStarted { .. })));
        let events = tick_n(&mut runner, 3);
        assert!(events.iter().any(|e| matches!(e, Event::SessionCompleted { .. })));
        assert_eq!(runner.status(), SessionStatus::Completed);

        let result = runner.complete_session(false).unwrap();
        assert_eq!(result.sets_completed, 1);
        assert_eq!(result.total_elapsed_secs, 3);
        assert!(!result.skipped_early);
    }

    #[test]
    fn multi_set_flow_waits_for_advance() {
        let mut runner = SessionRunner::new(SessionKind::PtExercise, 2, 3).unwrap();
        runner.resume().unwrap();
        let events = tick_n(&mut runner, 2);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::SetCompleted { set_index: 1, total_sets: 3, .. })));
        assert_eq!(runner.status(), SessionStatus::SetComplete);

        // Ticks between sets change nothing.
        assert!(runner.tick().is_empty());
        assert!(runner.resume().is_err());

        runner.advance_set().unwrap();
        assert_eq!(runner.current_set(), 2);
        assert_eq!(runner.status(), SessionStatus::Idle);
        assert_eq!(runner.remaining_secs(), 2);
    }

    #[test]
    fn advance_set_rejected_while_time_remains() {
        let mut runner = SessionRunner::new(SessionKind::PtExercise, 5, 2).unwrap();
        runner.resume().unwrap();
        runner.tick();
        assert!(matches!(
            runner.advance_set(),
            Err(TimerError::InvalidTransition { op: "advance_set", state: TimerState::Running })
        ));
    }

    #[test]
    fn advance_set_rejected_after_last_set() {
        let mut runner = SessionRunner::new(SessionKind::PtExercise, 1, 1).unwrap();
        runner.resume().unwrap();
        runner.tick();
        assert!(runner.advance_set().is_err());
    }

    #[test]
    fn ending_early_reports_partial_sets() {
        let mut runner = SessionRunner::new(SessionKind::PtExercise, 2, 3).unwrap();
        runner.resume().unwrap();
        tick_n(&mut runner, 2);
        runner.advance_set().unwrap();
        runner.resume().unwrap();
        runner.tick();

        let result = runner.complete_session(false).unwrap();
        assert_eq!(result.sets_completed, 1);
        assert_eq!(result.total_sets, 3);
        assert_eq!(result.total_elapsed_secs, 3);
        assert!(result.skipped_early);
        assert_eq!(runner.status(), SessionStatus::Completed);
    }

    #[test]
    fn complete_session_is_one_shot() {
        let sink = MemorySink::default();
        let mut runner = SessionRunner::new(SessionKind::Meditation, 10, 1).unwrap();
        runner.resume().unwrap();
        assert!(runner.complete_and_submit(true, &sink).unwrap().is_some());
        assert!(runner.complete_and_submit(true, &sink).unwrap().is_none());
        assert!(runner.complete_session(false).is_none());
        assert_eq!(sink.results().len(), 1);
    }

    #[test]
    fn finished_session_rejects_controls() {
        let mut runner = SessionRunner::new(SessionKind::Rest, 10, 1).unwrap();
        runner.resume().unwrap();
        runner.complete_session(true);
        assert!(runner.resume().is_err());
        assert!(runner.pause().is_err());
        assert!(runner.select_preset(30).is_err());
        assert!(runner.tick().is_empty());
    }

    #[test]
    fn preset_mid_countdown_restarts_set() {
        let mut runner = SessionRunner::new(SessionKind::Rest, 90, 1)
            .unwrap()
            .with_presets([30, 60, 90, 120, 180]);
        runner.resume().unwrap();
        tick_n(&mut runner, 25);
        assert_eq!(runner.remaining_secs(), 65);

        runner.select_preset(60).unwrap();
        assert_eq!(runner.remaining_secs(), 60);
        assert_eq!(runner.status(), SessionStatus::Running);
        assert_eq!(runner.total_elapsed_secs(), 0);
    }

    #[test]
    fn preset_from_idle_starts_running() {
        let mut runner = SessionRunner::new(SessionKind::Rest, 90, 1).unwrap();
        runner.select_preset(120).unwrap();
        assert_eq!(runner.status(), SessionStatus::Running);
        assert_eq!(runner.duration_secs(), 120);
        assert!(runner.select_preset(0).is_err());
    }

    #[test]
    fn pause_then_resume_emits_resumed() {
        let mut runner = SessionRunner::new(SessionKind::Meditation, 60, 1).unwrap();
        runner.resume().unwrap();
        runner.tick();
        assert!(matches!(runner.pause().unwrap(), Some(Event::TimerPaused { remaining_secs: 59, .. })));
        assert!(runner.tick().is_empty());
        assert!(matches!(runner.resume().unwrap(), Some(Event::TimerResumed { remaining_secs: 59, .. })));
        assert!(runner.resume().unwrap().is_none());
    }

    #[test]
    fn guidance_follows_progress() {
        let mut runner = SessionRunner::new(SessionKind::Meditation, 4, 1)
            .unwrap()
            .with_guidance(["breathe in", "hold", "breathe out", "rest"]);
        assert_eq!(runner.current_guidance(), Some("breathe in"));
        runner.resume().unwrap();
        runner.tick();
        assert_eq!(runner.current_guidance(), Some("hold"));
        runner.tick();
        runner.tick();
        assert_eq!(runner.current_guidance(), Some("rest"));
    }

    #[test]
    fn guidance_index_edges() {
        assert_eq!(guidance_index_for(0.0, 5), 0);
        assert_eq!(guidance_index_for(1.0, 5), 4);
        assert_eq!(guidance_index_for(0.5, 4), 2);
        assert_eq!(guidance_index_for(-1.0, 3), 0);
        assert_eq!(guidance_index_for(7.0, 3), 2);
        assert_eq!(guidance_index_for(f64::NAN, 3), 0);
        assert_eq!(guidance_index_for(0.7, 0), 0);
    }

    #[test]
    fn snapshot_reflects_state() {
        let runner = SessionRunner::new(SessionKind::PtExercise, 30, 3).unwrap();
        match runner.snapshot() {
            Event::StateSnapshot {
                status,
                set_index,
                remaining_secs,
                total_sets,
                ..
            } => {
                assert_eq!(status, SessionStatus::Idle);
                assert_eq!(set_index, 1);
                assert_eq!(total_sets, 3);
                assert_eq!(remaining_secs, 30);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn guidance_index_is_monotonic_and_bounded(
            a in 0.0f64..=1.0,
            b in 0.0f64..=1.0,
            steps in 1usize..64,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let i = guidance_index_for(lo, steps);
            let j = guidance_index_for(hi, steps);
            prop_assert!(i <= j);
            prop_assert!(j < steps);
        }

        #[test]
        fn ending_before_final_set_is_skipped_early(n in 2u32..8, done_frac in 0.0f64..1.0) {
            let done = ((f64::from(n) * done_frac) as u32).min(n - 1);
            let mut runner = SessionRunner::new(SessionKind::PtExercise, 3, n).unwrap();
            for _ in 0..done {
                runner.resume().unwrap();
                tick_n(&mut runner, 3);
                runner.advance_set().unwrap();
            }
            let result = runner.complete_session(false).unwrap();
            prop_assert!(result.sets_completed < n);
            prop_assert_eq!(result.sets_completed, done);
            prop_assert!(result.skipped_early);
        }
    }
}
