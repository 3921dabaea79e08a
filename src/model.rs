use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::timefmt::serde_instant;

/// Stored `freq_unit` value marking a one-off task.
pub const ONCE: &str = "once";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Hours,
    Days,
    Weeks,
}

impl IntervalUnit {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hours" => Ok(Self::Hours),
            "days" => Ok(Self::Days),
            "weeks" => Ok(Self::Weeks),
            _ => Err(Error::validation(format!(
                "invalid interval_unit '{s}': must be hours, days, weeks, or once"
            ))),
        }
    }

    /// Lenient read of a stored unit. Rows written before units were
    /// validated may hold anything; those are read with a day's length.
    pub fn from_stored(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|_| {
            log::warn!("unrecognized stored interval unit '{s}', using days");
            Self::Days
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hours => "hours",
            Self::Days => "days",
            Self::Weeks => "weeks",
        }
    }

    pub fn seconds(self) -> i64 {
        match self {
            Self::Hours => 3_600,
            Self::Days => 86_400,
            Self::Weeks => 604_800,
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    Recurring {
        interval_value: i64,
        unit: IntervalUnit,
    },
    /// `due_at` is only `None` for rows that predate the column.
    OneOff { due_at: Option<DateTime<Utc>> },
}

impl Schedule {
    pub fn is_one_off(&self) -> bool {
        matches!(self, Self::OneOff { .. })
    }

    /// Value stored in `freq_value`; zero for one-off tasks.
    pub fn interval_value(&self) -> i64 {
        match self {
            Self::Recurring { interval_value, .. } => *interval_value,
            Self::OneOff { .. } => 0,
        }
    }

    /// Value stored in `freq_unit`.
    pub fn unit_str(&self) -> &'static str {
        match self {
            Self::Recurring { unit, .. } => unit.as_str(),
            Self::OneOff { .. } => ONCE,
        }
    }

    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Recurring { .. } => None,
            Self::OneOff { due_at } => *due_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub notes: Option<String>,
    pub schedule: Schedule,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionLog {
    pub id: i64,
    pub task_id: i64,
    pub title: String,
    #[serde(serialize_with = "serde_instant::serialize")]
    pub done_at: DateTime<Utc>,
}

/// Where a task stands right now. Never stored; see `TaskView`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Due,
    Inactive,
}

impl TaskState {
    pub fn derive(is_active: bool, is_due: bool) -> Self {
        match (is_active, is_due) {
            (false, _) => Self::Inactive,
            (true, true) => Self::Due,
            (true, false) => Self::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Due => "due",
            Self::Inactive => "inactive",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Pending => ".",
            Self::Due => "!",
            Self::Inactive => "x",
        }
    }
}

/// A task decorated with the fields derived from its completion history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub task: Task,
    pub last_done: Option<DateTime<Utc>>,
    pub due_at: DateTime<Utc>,
    pub is_due: bool,
}

impl TaskView {
    pub fn state(&self) -> TaskState {
        TaskState::derive(self.task.is_active, self.is_due)
    }
}

#[derive(Serialize)]
struct TaskViewWire<'a> {
    id: i64,
    title: &'a str,
    notes: Option<&'a str>,
    interval_value: i64,
    interval_unit: &'static str,
    is_active: bool,
    #[serde(serialize_with = "serde_instant::option::serialize")]
    last_done: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serde_instant::serialize")]
    due_at: DateTime<Utc>,
    is_due: bool,
    #[serde(serialize_with = "serde_instant::serialize")]
    created_at: DateTime<Utc>,
    #[serde(serialize_with = "serde_instant::serialize")]
    updated_at: DateTime<Utc>,
}

impl Serialize for TaskView {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let t = &self.task;
        TaskViewWire {
            id: t.id,
            title: &t.title,
            notes: t.notes.as_deref(),
            interval_value: t.schedule.interval_value(),
            interval_unit: t.schedule.unit_str(),
            is_active: t.is_active,
            last_done: self.last_done,
            due_at: self.due_at,
            is_due: self.is_due,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
        .serialize(serializer)
    }
}

/// Input for creating a task. Field names follow the API; the original
/// `freq_*` names are accepted too.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, alias = "freq_value")]
    pub interval_value: Option<i64>,
    #[serde(default, alias = "freq_unit")]
    pub interval_unit: Option<String>,
    #[serde(default)]
    pub due_at: Option<String>,
}

/// Partial update. Absent fields are left alone; `notes: null` clears notes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub notes: Option<Option<String>>,
    #[serde(default, alias = "freq_value")]
    pub interval_value: Option<i64>,
    #[serde(default, alias = "freq_unit")]
    pub interval_unit: Option<String>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Distinguish a field sent as `null` (`Some(None)`) from an absent one
/// (`None`, via `#[serde(default)]`).
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unit_parse_is_case_insensitive_and_strict() {
        assert_eq!(IntervalUnit::parse("Weeks").unwrap(), IntervalUnit::Weeks);
        assert_eq!(IntervalUnit::parse(" hours ").unwrap(), IntervalUnit::Hours);
        assert!(IntervalUnit::parse("months").is_err());
        assert!(IntervalUnit::parse("once").is_err());
    }

    #[test]
    fn unknown_stored_unit_reads_as_days() {
        assert_eq!(IntervalUnit::from_stored("months"), IntervalUnit::Days);
        assert_eq!(IntervalUnit::from_stored("weeks"), IntervalUnit::Weeks);
    }

    #[test]
    fn state_derivation() {
        assert_eq!(TaskState::derive(true, false), TaskState::Pending);
        assert_eq!(TaskState::derive(true, true), TaskState::Due);
        assert_eq!(TaskState::derive(false, true), TaskState::Inactive);
        assert_eq!(TaskState::derive(false, false), TaskState::Inactive);
    }

    #[test]
    fn patch_distinguishes_null_from_absent_notes() {
        let absent: TaskPatch = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(absent.notes, None);

        let cleared: TaskPatch = serde_json::from_str(r#"{"notes":null}"#).unwrap();
        assert_eq!(cleared.notes, Some(None));

        let set: TaskPatch = serde_json::from_str(r#"{"notes":"hi"}"#).unwrap();
        assert_eq!(set.notes, Some(Some("hi".into())));
    }

    #[test]
    fn new_task_accepts_original_field_names() {
        let input: NewTask =
            serde_json::from_str(r#"{"title":"t","freq_value":3,"freq_unit":"weeks"}"#).unwrap();
        assert_eq!(input.interval_value, Some(3));
        assert_eq!(input.interval_unit.as_deref(), Some("weeks"));
    }

    #[test]
    fn view_serializes_flat_with_zulu_instants() {
        let created = Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap();
        let due = Utc.with_ymd_and_hms(2025, 9, 7, 18, 30, 0).unwrap();
        let view = TaskView {
            task: Task {
                id: 7,
                title: "Renew passport".into(),
                notes: None,
                schedule: Schedule::OneOff { due_at: Some(due) },
                is_active: true,
                created_at: created,
                updated_at: created,
            },
            last_done: None,
            due_at: due,
            is_due: false,
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["interval_value"], 0);
        assert_eq!(json["interval_unit"], "once");
        assert_eq!(json["due_at"], "2025-09-07T18:30:00Z");
        assert!(json["last_done"].is_null());
        assert_eq!(json["is_due"], false);
    }
}
