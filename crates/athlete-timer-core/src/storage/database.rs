//! SQLite-based session result log.
//!
//! Provides persistent storage for:
//! - Finished session results (rest, meditation, PT adherence)
//! - Per-kind adherence summaries
//! - Key-value store for small app state such as the API auth token

use std::path::Path;

use chrono::{DateTime, Local, NaiveTime, TimeDelta, TimeZone, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{CoreError, DatabaseError, SubmitError};
use crate::sink::SessionSink;
use crate::timer::{SessionKind, SessionResult};

const AUTH_TOKEN_KEY: &str = "auth_token";

const RESULT_COLUMNS: &str = "id, kind, sets_completed, total_sets, total_elapsed_secs, \
    skipped_early, started_at, finished_at, synced";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResult {
    pub id: i64,
    pub result: SessionResult,
    /// Whether the remote API has accepted this result.
    pub synced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct KindSummary {
    pub sessions: u64,
    pub completed_sessions: u64,
    pub skipped_sessions: u64,
    pub total_sets: u64,
    pub total_elapsed_secs: u64,
    pub today_sessions: u64,
}

/// SQLite database for session results.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/athlete-timer/athlete-timer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("athlete-timer.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS session_results (
                id                 INTEGER PRIMARY KEY AUTOINCREMENT,
                kind               TEXT NOT NULL,
                sets_completed     INTEGER NOT NULL,
                total_sets         INTEGER NOT NULL,
                total_elapsed_secs INTEGER NOT NULL,
                skipped_early      INTEGER NOT NULL,
                started_at         TEXT NOT NULL,
                finished_at        TEXT NOT NULL,
                synced             INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_results_finished_at ON session_results(finished_at);
            CREATE INDEX IF NOT EXISTS idx_results_kind ON session_results(kind);",
        )?;
        Ok(())
    }

    /// Record a finished session. Returns the row id.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_result(&self, result: &SessionResult) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO session_results
                (kind, sets_completed, total_sets, total_elapsed_secs, skipped_early, started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                result.kind.as_str(),
                result.sets_completed,
                result.total_sets,
                result.total_elapsed_secs,
                result.skipped_early,
                result.started_at.to_rfc3339(),
                result.finished_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn mark_synced(&self, id: i64) -> Result<(), DatabaseError> {
        self.conn
            .execute("UPDATE session_results SET synced = 1 WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Most recent results first, optionally filtered by kind.
    pub fn recent_results(
        &self,
        kind: Option<SessionKind>,
        limit: usize,
    ) -> Result<Vec<StoredResult>, DatabaseError> {
        self.query_results(
            &format!(
                "SELECT {RESULT_COLUMNS} FROM session_results
                 WHERE ?1 IS NULL OR kind = ?1
                 ORDER BY finished_at DESC, id DESC
                 LIMIT ?2"
            ),
            params![kind.map(SessionKind::as_str), limit as i64],
        )
    }

    /// Results the API has not accepted yet, oldest first.
    pub fn unsynced_results(&self) -> Result<Vec<StoredResult>, DatabaseError> {
        self.query_results(
            &format!("SELECT {RESULT_COLUMNS} FROM session_results WHERE synced = 0 ORDER BY id"),
            [],
        )
    }

    fn query_results<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<StoredResult>, DatabaseError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, u64>(4)?,
                row.get::<_, bool>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, bool>(8)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, kind, sets_completed, total_sets, total_elapsed_secs, skipped_early, started, finished, synced) = row?;
            let kind = SessionKind::parse(&kind).ok_or_else(|| DatabaseError::CorruptRow {
                table: "session_results",
                message: format!("unknown kind '{kind}' in row {id}"),
            })?;
            out.push(StoredResult {
                id,
                result: SessionResult {
                    kind,
                    sets_completed,
                    total_sets,
                    total_elapsed_secs,
                    skipped_early,
                    started_at: parse_timestamp(&started, id)?,
                    finished_at: parse_timestamp(&finished, id)?,
                },
                synced,
            });
        }
        Ok(out)
    }

    /// Totals for `kind`. "Today" is the user's local calendar day.
    pub fn summary(&self, kind: SessionKind) -> Result<KindSummary, DatabaseError> {
        self.summary_since(kind, local_midnight_utc(Local::now()))
    }

    fn summary_since(
        &self,
        kind: SessionKind,
        day_start: DateTime<Utc>,
    ) -> Result<KindSummary, DatabaseError> {
        let summary = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN skipped_early = 0 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN skipped_early = 1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(sets_completed), 0),
                    COALESCE(SUM(total_elapsed_secs), 0),
                    COALESCE(SUM(CASE WHEN finished_at >= ?2 THEN 1 ELSE 0 END), 0)
             FROM session_results
             WHERE kind = ?1",
            params![kind.as_str(), day_start.to_rfc3339()],
            |row| {
                Ok(KindSummary {
                    sessions: row.get(0)?,
                    completed_sessions: row.get(1)?,
                    skipped_sessions: row.get(2)?,
                    total_sets: row.get(3)?,
                    total_elapsed_secs: row.get(4)?,
                    today_sessions: row.get(5)?,
                })
            },
        )?;
        Ok(summary)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    pub fn auth_token(&self) -> Result<Option<String>, DatabaseError> {
        self.kv_get(AUTH_TOKEN_KEY)
    }

    pub fn set_auth_token(&self, token: &str) -> Result<(), DatabaseError> {
        self.kv_set(AUTH_TOKEN_KEY, token)
    }

    pub fn clear_auth_token(&self) -> Result<(), DatabaseError> {
        self.kv_delete(AUTH_TOKEN_KEY)
    }
}

/// Local adherence log. Accepts every result.
impl SessionSink for Database {
    fn name(&self) -> &str {
        "local"
    }

    fn submit_session_result(
        &self,
        _kind: SessionKind,
        result: &SessionResult,
    ) -> Result<(), SubmitError> {
        let id = self.record_result(result)?;
        tracing::debug!(id, kind = %result.kind, "session result recorded locally");
        Ok(())
    }
}

/// Start of `now`'s local day as a UTC instant. A midnight skipped by DST
/// falls back to the first valid local time after it.
fn local_midnight_utc<Tz: TimeZone>(now: DateTime<Tz>) -> DateTime<Utc> {
    let tz = now.timezone();
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + TimeDelta::hours(1))).earliest())
        .map_or_else(|| now.with_timezone(&Utc), |dt| dt.with_timezone(&Utc))
}

fn parse_timestamp(s: &str, id: i64) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow {
            table: "session_results",
            message: format!("bad timestamp '{s}' in row {id}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn result(kind: SessionKind, sets: u32, skipped: bool) -> SessionResult {
        let now = Utc::now();
        SessionResult {
            kind,
            sets_completed: sets,
            total_sets: 3,
            total_elapsed_secs: u64::from(sets) * 30,
            skipped_early: skipped,
            started_at: now - Duration::seconds(90),
            finished_at: now,
        }
    }

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        let id = db.record_result(&result(SessionKind::PtExercise, 3, false)).unwrap();
        let rows = db.recent_results(None, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].result.sets_completed, 3);
        assert!(!rows[0].synced);
    }

    #[test]
    fn filter_by_kind() {
        let db = Database::open_memory().unwrap();
        db.record_result(&result(SessionKind::PtExercise, 3, false)).unwrap();
        db.record_result(&result(SessionKind::Rest, 1, false)).unwrap();
        let pt = db.recent_results(Some(SessionKind::PtExercise), 10).unwrap();
        assert_eq!(pt.len(), 1);
        assert_eq!(pt[0].result.kind, SessionKind::PtExercise);
    }

    #[test]
    fn summary_counts_adherence() {
        let db = Database::open_memory().unwrap();
        db.record_result(&result(SessionKind::PtExercise, 3, false)).unwrap();
        db.record_result(&result(SessionKind::PtExercise, 1, true)).unwrap();
        db.record_result(&result(SessionKind::Meditation, 1, false)).unwrap();

        let summary = db.summary(SessionKind::PtExercise).unwrap();
        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.completed_sessions, 1);
        assert_eq!(summary.skipped_sessions, 1);
        assert_eq!(summary.total_sets, 4);
        assert_eq!(summary.total_elapsed_secs, 120);
        assert_eq!(summary.today_sessions, 2);
    }

    #[test]
    fn sync_flag() {
        let db = Database::open_memory().unwrap();
        let a = db.record_result(&result(SessionKind::Rest, 1, false)).unwrap();
        let b = db.record_result(&result(SessionKind::Rest, 1, false)).unwrap();
        db.mark_synced(a).unwrap();
        let pending = db.unsynced_results().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b);
    }

    #[test]
    fn unsynced_results_oldest_first() {
        let db = Database::open_memory().unwrap();
        let a = db.record_result(&result(SessionKind::Rest, 1, false)).unwrap();
        let b = db.record_result(&result(SessionKind::Meditation, 1, false)).unwrap();
        let c = db.record_result(&result(SessionKind::PtExercise, 2, false)).unwrap();
        db.mark_synced(b).unwrap();
        let ids: Vec<_> = db.unsynced_results().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn today_starts_at_local_midnight() {
        let tz = FixedOffset::east_opt(5 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2026, 3, 14, 1, 30, 0).unwrap();
        assert_eq!(
            local_midnight_utc(now),
            Utc.with_ymd_and_hms(2026, 3, 13, 19, 0, 0).unwrap()
        );
    }

    #[test]
    fn summary_today_uses_day_start() {
        let db = Database::open_memory().unwrap();
        let day_start = Utc.with_ymd_and_hms(2026, 3, 13, 19, 0, 0).unwrap();
        let mut before = result(SessionKind::Rest, 1, false);
        before.finished_at = day_start - Duration::minutes(5);
        let mut after = result(SessionKind::Rest, 1, false);
        after.finished_at = day_start + Duration::minutes(5);
        db.record_result(&before).unwrap();
        db.record_result(&after).unwrap();

        let summary = db.summary_since(SessionKind::Rest, day_start).unwrap();
        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.today_sessions, 1);
    }

    #[test]
    fn kv_store_and_token() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");

        db.set_auth_token("secret").unwrap();
        assert_eq!(db.auth_token().unwrap().as_deref(), Some("secret"));
        db.clear_auth_token().unwrap();
        assert!(db.auth_token().unwrap().is_none());
    }

    #[test]
    fn database_is_a_sink() {
        let db = Database::open_memory().unwrap();
        let sink: &dyn SessionSink = &db;
        sink.submit_session_result(SessionKind::Meditation, &result(SessionKind::Meditation, 1, false))
            .unwrap();
        assert_eq!(db.recent_results(Some(SessionKind::Meditation), 5).unwrap().len(), 1);
    }
}
