//! Destinations for finished session results.
//!
//! A sink is the only boundary between the timer core and the application's
//! data layer. Retry and backoff belong to the sink, never to the runner.

use std::sync::Mutex;

use crate::error::SubmitError;
use crate::timer::{SessionKind, SessionResult};

/// Anything that can persist a [`SessionResult`].
pub trait SessionSink {
    /// Short identifier used in logs (e.g. "local", "api").
    fn name(&self) -> &str;

    fn submit_session_result(
        &self,
        kind: SessionKind,
        result: &SessionResult,
    ) -> Result<(), SubmitError>;
}

/// Keeps results in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    results: Mutex<Vec<(SessionKind, SessionResult)>>,
}

impl MemorySink {
    pub fn results(&self) -> Vec<(SessionKind, SessionResult)> {
        self.results
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl SessionSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn submit_session_result(
        &self,
        kind: SessionKind,
        result: &SessionResult,
    ) -> Result<(), SubmitError> {
        let mut results = self
            .results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        results.push((kind, result.clone()));
        Ok(())
    }
}
