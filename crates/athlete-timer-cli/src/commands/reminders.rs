use athlete_timer_core::notify::{daily_triggers, NotificationCenter};
use athlete_timer_core::Config;
use chrono::Local;
use serde_json::json;

use crate::terminal::TerminalBackend;

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut center = NotificationCenter::new(TerminalBackend);
    center.init(daily_triggers(&config.reminders)?)?;

    let now = Local::now();
    if json {
        let rows: Vec<_> = center
            .scheduled()
            .iter()
            .map(|(id, t)| {
                json!({
                    "id": id,
                    "kind": t.kind,
                    "time": t.time.format("%H:%M").to_string(),
                    "title": t.title,
                    "next_fire": t.next_fire_after(&now).map(|dt| dt.to_rfc3339()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if center.scheduled().is_empty() {
        println!("no reminders configured");
    } else {
        for (_, t) in center.scheduled() {
            let next = t
                .next_fire_after(&now)
                .map(|dt| dt.format("%a %H:%M").to_string())
                .unwrap_or_else(|| "-".into());
            println!("{}  {:<24} next: {}", t.time.format("%H:%M"), t.title, next);
        }
    }

    center.teardown()?;
    Ok(())
}
