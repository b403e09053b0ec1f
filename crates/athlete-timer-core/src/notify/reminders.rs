//! Daily reminder triggers computed from [`ReminderConfig`].

use chrono::{DateTime, Days, NaiveTime, TimeDelta, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::storage::ReminderConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    SleepLog,
    WorkoutLog,
    NutritionLog,
    MentalHealthCheckin,
    PtExercise,
}

impl ReminderKind {
    pub fn config_key(self) -> &'static str {
        match self {
            ReminderKind::SleepLog => "reminders.sleep_log",
            ReminderKind::WorkoutLog => "reminders.workout_log",
            ReminderKind::NutritionLog => "reminders.nutrition_log",
            ReminderKind::MentalHealthCheckin => "reminders.mental_health_checkin",
            ReminderKind::PtExercise => "reminders.pt_exercise",
        }
    }

    fn title(self) -> &'static str {
        match self {
            ReminderKind::SleepLog => "Log your sleep",
            ReminderKind::WorkoutLog => "Log today's training",
            ReminderKind::NutritionLog => "Log your meals",
            ReminderKind::MentalHealthCheckin => "Daily check-in",
            ReminderKind::PtExercise => "PT exercises",
        }
    }

    fn body(self) -> &'static str {
        match self {
            ReminderKind::SleepLog => "How did you sleep? Recovery starts with rest.",
            ReminderKind::WorkoutLog => "Record your workout and RPE while it's fresh.",
            ReminderKind::NutritionLog => "Fuel matters. Add what you ate today.",
            ReminderKind::MentalHealthCheckin => "Take a minute to note how you're feeling.",
            ReminderKind::PtExercise => "Time for your scoliosis exercise routine.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTrigger {
    pub kind: ReminderKind,
    pub time: NaiveTime,
    pub title: String,
    pub body: String,
}

impl DailyTrigger {
    /// Next time this trigger fires strictly after `now`, in `now`'s zone.
    ///
    /// If the wall-clock time doesn't exist that day (DST gap) it fires an
    /// hour later. `None` only when the date arithmetic overflows.
    pub fn next_fire_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = now.timezone();
        let local_now = now.naive_local();
        let mut date = local_now.date();
        if date.and_time(self.time) <= local_now {
            date = date.checked_add_days(Days::new(1))?;
        }
        let naive = date.and_time(self.time);
        tz.from_local_datetime(&naive)
            .earliest()
            .or_else(|| tz.from_local_datetime(&(naive + TimeDelta::hours(1))).earliest())
    }
}

fn parse_time(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected HH:MM, got '{value}': {e}"),
    })
}

/// One trigger per configured reminder, earliest first. Empty when
/// reminders are disabled.
pub fn daily_triggers(config: &ReminderConfig) -> Result<Vec<DailyTrigger>, ConfigError> {
    if !config.enabled {
        return Ok(Vec::new());
    }
    let slots = [
        (ReminderKind::SleepLog, &config.sleep_log),
        (ReminderKind::WorkoutLog, &config.workout_log),
        (ReminderKind::NutritionLog, &config.nutrition_log),
        (ReminderKind::MentalHealthCheckin, &config.mental_health_checkin),
        (ReminderKind::PtExercise, &config.pt_exercise),
    ];

    let mut triggers = Vec::new();
    for (kind, value) in slots {
        let Some(value) = value else { continue };
        triggers.push(DailyTrigger {
            kind,
            time: parse_time(kind.config_key(), value)?,
            title: kind.title().to_string(),
            body: kind.body().to_string(),
        });
    }
    triggers.sort_by_key(|t| t.time);
    Ok(triggers)
}
