mod config;
pub mod database;

pub use config::{ApiConfig, Config, ReminderConfig, TimerConfig};
pub use database::{Database, KindSummary, StoredResult};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Where the data directory lives. Nothing is created.
///
/// `ATHLETE_TIMER_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/athlete-timer[-dev]/`, with `ATHLETE_TIMER_ENV=dev` selecting the
/// development directory.
pub fn data_dir_path() -> PathBuf {
    match std::env::var_os("ATHLETE_TIMER_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("ATHLETE_TIMER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("athlete-timer-dev")
            } else {
                base_dir.join("athlete-timer")
            }
        }
    }
}

/// Returns the data directory, creating it if needed.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = data_dir_path();
    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
