mod countdown;
mod driver;
mod session;

pub use countdown::{CountdownEngine, TickOutcome, TimerState};
pub use driver::{SessionDriver, DEFAULT_TICK_INTERVAL};
pub use session::{guidance_index_for, SessionKind, SessionResult, SessionRunner, SessionStatus};
