//! # Athlete Timer Core Library
//!
//! Core logic for the timed sessions of a teen athlete health tracker: the
//! workout rest timer, guided meditation and scoliosis PT exercise holds.
//! All three share one countdown engine and one session runner; the CLI and
//! any GUI are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: a tick-driven countdown state machine, a session runner that
//!   adds sets, presets and guidance, and a Tokio driver that owns the single
//!   tick source per session
//! - **Sinks**: where finished [`SessionResult`]s go (local SQLite log or the
//!   remote HTTP API)
//! - **Storage**: TOML configuration and SQLite result log / token store
//! - **Notify**: daily reminder triggers and an explicitly owned
//!   notification center
//!
//! ## Key Components
//!
//! - [`SessionRunner`]: per-session state machine
//! - [`SessionDriver`]: real-time tick source
//! - [`SessionSink`]: persistence collaborator trait
//! - [`Config`]: application configuration management

pub mod api;
pub mod error;
pub mod events;
pub mod notify;
pub mod sink;
pub mod storage;
pub mod templates;
pub mod timer;

pub use api::ApiClient;
pub use error::{ConfigError, CoreError, DatabaseError, NotifyError, SubmitError, TimerError};
pub use events::Event;
pub use notify::{NotificationBackend, NotificationCenter};
pub use sink::{MemorySink, SessionSink};
pub use storage::{Config, Database};
pub use templates::{builtin_templates, find_template, SessionTemplate};
pub use timer::{
    guidance_index_for, CountdownEngine, SessionDriver, SessionKind, SessionResult, SessionRunner,
    SessionStatus, TimerState,
};
