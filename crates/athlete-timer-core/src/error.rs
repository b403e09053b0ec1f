//! Core error types for athlete-timer-core.
//!
//! Timer contract violations, persistence failures and configuration
//! problems each get their own enum; [`CoreError`] unifies them for callers
//! that don't care which layer failed.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::TimerState;

/// Core error type for athlete-timer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Timer contract violations
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session result submission errors
    #[error("Submit error: {0}")]
    Submit(#[from] SubmitError),

    /// Notification center errors
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the countdown engine and session runner.
///
/// All of these are caller bugs rather than user-facing conditions. They are
/// logged and returned; nothing in the timer core panics on them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// A countdown or set count of zero.
    #[error("Invalid duration: {0} (must be at least 1)")]
    InvalidDuration(u32),

    /// Operation not permitted in the current state.
    #[error("Invalid transition: cannot {op} while {state:?}")]
    InvalidTransition { op: &'static str, state: TimerState },

    /// A second completion for the same session. Suppressed, only logged.
    #[error("Duplicate completion signal suppressed")]
    DuplicateCompletion,
}

/// Errors from a [`SessionSink`](crate::sink::SessionSink).
#[derive(Error, Debug)]
pub enum SubmitError {
    /// Transport failure after all retries
    #[error("Request to {url} failed after {attempts} attempt(s): {message}")]
    Transport {
        url: String,
        attempts: u32,
        message: String,
    },

    /// Server answered with a non-success status
    #[error("Server rejected session result ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// API base URL not configured
    #[error("API base URL is not configured")]
    NotConfigured,

    /// Local log write failed
    #[error("Local log write failed: {0}")]
    Local(#[from] DatabaseError),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored row could not be decoded
    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: &'static str, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Data directory could not be resolved or created
    #[error("Data directory unavailable at {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dotted key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Notification center errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Used before `init()` or after `teardown()`
    #[error("Notification center is not initialized")]
    NotInitialized,

    /// Backend refused the request
    #[error("Notification backend failed: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
