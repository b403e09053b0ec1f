use athlete_timer_core::{Database, SessionKind};
use serde_json::json;

pub fn history(kind: Option<&str>, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let kind = kind
        .map(|k| SessionKind::parse(k).ok_or_else(|| format!("unknown session kind: {k}")))
        .transpose()?;
    let db = Database::open()?;
    let rows = db.recent_results(kind, limit)?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

pub fn stats() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut out = serde_json::Map::new();
    for kind in [SessionKind::Rest, SessionKind::Meditation, SessionKind::PtExercise] {
        out.insert(kind.as_str().to_string(), json!(db.summary(kind)?));
    }
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
