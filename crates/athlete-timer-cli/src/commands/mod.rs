pub mod auth;
pub mod config;
pub mod history;
pub mod reminders;
pub mod run;
pub mod sync;
pub mod templates;
