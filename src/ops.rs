use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::db;
use crate::error::{Error, Result};
use crate::model::{CompletionLog, IntervalUnit, NewTask, Schedule, Task, TaskPatch, TaskView, ONCE};
use crate::schedule;
use crate::timefmt::{format_instant, parse_instant, parse_legacy_instant, to_stored_precision};

/// Most completions `list_logs` returns in one call.
pub const LOG_PAGE_SIZE: usize = 100;

const DEFAULT_TITLE: &str = "Untitled";

const TASK_COLUMNS: &str =
    "id, title, notes, freq_value, freq_unit, is_active, due_at, created_at, updated_at";

const INSERT_TASK: &str = "
INSERT INTO tasks (title, notes, freq_value, freq_unit, is_active, due_at, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?6)
";

const UPDATE_TASK: &str = "
UPDATE tasks
SET title = ?1, notes = ?2, freq_value = ?3, freq_unit = ?4, is_active = ?5, due_at = ?6,
    updated_at = ?7
WHERE id = ?8
";

const INSERT_LOG: &str = "INSERT INTO task_logs (task_id, title, done_at) VALUES (?1, ?2, ?3)";

const RETIRE_TASK: &str = "UPDATE tasks SET is_active = 0, updated_at = ?1 WHERE id = ?2";

const LIST_WITH_LAST_DONE: &str = "
SELECT t.id, t.title, t.notes, t.freq_value, t.freq_unit, t.is_active, t.due_at,
       t.created_at, t.updated_at,
       (SELECT MAX(l.done_at) FROM task_logs l WHERE l.task_id = t.id)
FROM tasks t
ORDER BY t.id
";

/// Stored instants are best effort: an unreadable value reads as unset.
fn optional_instant_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw.as_deref().and_then(parse_legacy_instant))
}

/// Read a task row. An unreadable `created_at` or `updated_at` falls back to
/// the other; a row with neither readable is skipped (`None`).
fn read_task_row(row: &rusqlite::Row) -> rusqlite::Result<Option<Task>> {
    let id: i64 = row.get(0)?;
    let created_at = optional_instant_col(row, 7)?;
    let updated_at = optional_instant_col(row, 8)?;
    let (created_at, updated_at) = match (created_at, updated_at) {
        (Some(c), Some(u)) => (c, u),
        (Some(c), None) => (c, c),
        (None, Some(u)) => (u, u),
        (None, None) => {
            log::warn!("skipping task {id}: unreadable created_at and updated_at");
            return Ok(None);
        }
    };
    let freq_value: i64 = row.get(3)?;
    let freq_unit: String = row.get(4)?;
    let schedule = if freq_unit == ONCE {
        Schedule::OneOff {
            due_at: optional_instant_col(row, 6)?,
        }
    } else {
        Schedule::Recurring {
            interval_value: freq_value,
            unit: IntervalUnit::from_stored(&freq_unit),
        }
    };
    Ok(Some(Task {
        id,
        title: row.get(1)?,
        notes: row.get(2)?,
        schedule,
        is_active: row.get(5)?,
        created_at,
        updated_at,
    }))
}

/// Read a log row; one with an unreadable `done_at` is skipped (`None`).
fn read_log_row(row: &rusqlite::Row) -> rusqlite::Result<Option<CompletionLog>> {
    let id: i64 = row.get(0)?;
    let Some(done_at) = optional_instant_col(row, 3)? else {
        log::warn!("skipping completion log {id}: unreadable done_at");
        return Ok(None);
    };
    Ok(Some(CompletionLog {
        id,
        task_id: row.get(1)?,
        title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        done_at,
    }))
}

fn find_task(conn: &Connection, id: i64) -> Result<Option<Task>> {
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
    Ok(conn.query_row(&query, [id], read_task_row).optional()?.flatten())
}

fn require_task(conn: &Connection, id: i64) -> Result<Task> {
    find_task(conn, id)?.ok_or(Error::NotFound(id))
}

fn validate_interval_value(value: i64) -> Result<i64> {
    if value < 1 {
        return Err(Error::validation(format!(
            "invalid interval_value {value}: must be a positive integer"
        )));
    }
    Ok(value)
}

fn is_once(unit: &str) -> bool {
    unit.trim().eq_ignore_ascii_case(ONCE)
}

fn parse_due_at(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_instant(s).map(to_stored_precision)).transpose()
}

/// One-off tasks report an `interval_value` of 0; any other value is a
/// client mistake.
fn check_no_interval(value: Option<i64>) -> Result<()> {
    match value {
        None | Some(0) => Ok(()),
        Some(v) => Err(Error::validation(format!(
            "interval_value {v} does not apply to one-off tasks (interval_unit \"once\")"
        ))),
    }
}

fn due_at_on_recurring() -> Error {
    Error::validation("due_at only applies to one-off tasks (interval_unit \"once\")")
}

/// Schedule for a new task. Unit defaults to days and value to 1; a one-off
/// task must come with a parsable `due_at` and no interval.
fn new_schedule(value: Option<i64>, unit: Option<&str>, due_at: Option<&str>) -> Result<Schedule> {
    match unit {
        Some(u) if is_once(u) => {
            check_no_interval(value)?;
            let due_at = parse_due_at(due_at)?
                .ok_or_else(|| Error::validation("due_at is required for one-off tasks"))?;
            Ok(Schedule::OneOff {
                due_at: Some(due_at),
            })
        }
        _ => {
            if due_at.is_some() {
                return Err(due_at_on_recurring());
            }
            Ok(Schedule::Recurring {
                interval_value: validate_interval_value(value.unwrap_or(1))?,
                unit: unit.map(IntervalUnit::parse).transpose()?.unwrap_or(IntervalUnit::Days),
            })
        }
    }
}

/// Apply the schedule-related fields of `patch` to `current`.
///
/// `stored_due_at` is whatever the `due_at` column holds, which for a
/// recurring task is normally nothing.
fn patched_schedule(
    current: &Schedule,
    stored_due_at: Option<DateTime<Utc>>,
    patch: &TaskPatch,
) -> Result<Schedule> {
    let new_due = parse_due_at(patch.due_at.as_deref())?;
    let to_once = match patch.interval_unit.as_deref() {
        Some(u) => is_once(u),
        None => current.is_one_off(),
    };

    if to_once {
        check_no_interval(patch.interval_value)?;
        let due_at = new_due.or(stored_due_at).ok_or_else(|| {
            Error::validation("due_at is required when switching a task to one-off")
        })?;
        return Ok(Schedule::OneOff {
            due_at: Some(due_at),
        });
    }

    if new_due.is_some() {
        return Err(due_at_on_recurring());
    }
    let (current_value, current_unit) = match current {
        Schedule::Recurring {
            interval_value,
            unit,
        } => (*interval_value, *unit),
        Schedule::OneOff { .. } => (1, IntervalUnit::Days),
    };
    let unit = match patch.interval_unit.as_deref() {
        Some(u) => IntervalUnit::parse(u)?,
        None => current_unit,
    };
    let interval_value = match patch.interval_value {
        Some(v) => validate_interval_value(v)?,
        None => current_value.max(1),
    };
    Ok(Schedule::Recurring {
        interval_value,
        unit,
    })
}

fn insert_task(
    conn: &Connection,
    title: &str,
    notes: Option<&str>,
    schedule: &Schedule,
    now: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        INSERT_TASK,
        rusqlite::params![
            title,
            notes,
            schedule.interval_value(),
            schedule.unit_str(),
            schedule.due_at().map(format_instant),
            format_instant(now),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn create_task(conn: &Connection, input: &NewTask, now: DateTime<Utc>) -> Result<i64> {
    let title = match input.title.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => DEFAULT_TITLE,
    };
    let schedule = new_schedule(
        input.interval_value,
        input.interval_unit.as_deref(),
        input.due_at.as_deref(),
    )?;
    let now = to_stored_precision(now);

    let id = db::transaction(conn, |c| {
        insert_task(c, title, input.notes.as_deref(), &schedule, now)
    })?;
    log::info!(
        "created task {id} '{title}' ({} {})",
        schedule.interval_value(),
        schedule.unit_str()
    );
    Ok(id)
}

pub fn update_task(
    conn: &Connection,
    id: i64,
    patch: &TaskPatch,
    now: DateTime<Utc>,
) -> Result<Task> {
    let now = to_stored_precision(now);
    let task = db::transaction(conn, |c| -> Result<Task> {
        let task = require_task(c, id)?;
        let stored_due_at: Option<String> =
            c.query_row("SELECT due_at FROM tasks WHERE id = ?1", [id], |row| row.get(0))?;
        let stored_due_at = stored_due_at.as_deref().and_then(parse_legacy_instant);

        let title = match patch.title.as_deref().map(str::trim) {
            Some("") => return Err(Error::validation("title must not be empty")),
            Some(t) => t.to_string(),
            None => task.title,
        };
        let notes = match &patch.notes {
            Some(n) => n.clone(),
            None => task.notes,
        };
        let schedule = patched_schedule(&task.schedule, stored_due_at, patch)?;
        let is_active = patch.is_active.unwrap_or(task.is_active);

        c.execute(
            UPDATE_TASK,
            rusqlite::params![
                title,
                notes,
                schedule.interval_value(),
                schedule.unit_str(),
                is_active,
                schedule.due_at().map(format_instant),
                format_instant(now),
                id,
            ],
        )?;
        Ok(Task {
            id,
            title,
            notes,
            schedule,
            is_active,
            created_at: task.created_at,
            updated_at: now,
        })
    })?;
    log::info!("updated task {id}");
    Ok(task)
}

/// Log a completion of `id` at `now`. One-off tasks retire; recurring tasks
/// stay active and become due again one interval after `now`.
///
/// Completing a one-off task that is already retired logs again and leaves
/// it retired.
pub fn complete_task(conn: &Connection, id: i64, now: DateTime<Utc>) -> Result<CompletionLog> {
    let done_at = to_stored_precision(now);
    let log = db::transaction(conn, |c| -> Result<CompletionLog> {
        let task = require_task(c, id)?;
        c.execute(
            INSERT_LOG,
            rusqlite::params![id, task.title, format_instant(done_at)],
        )?;
        let log = CompletionLog {
            id: c.last_insert_rowid(),
            task_id: id,
            title: task.title,
            done_at,
        };
        if task.schedule.is_one_off() && task.is_active {
            c.execute(RETIRE_TASK, rusqlite::params![format_instant(done_at), id])?;
        }
        Ok(log)
    })?;
    log::info!("completed task {id} at {}", format_instant(done_at));
    Ok(log)
}

/// Remove a task. Its completion logs go with it (`ON DELETE CASCADE`).
pub fn delete_task(conn: &Connection, id: i64) -> Result<()> {
    db::transaction(conn, |c| -> Result<()> {
        let rows = c.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        if rows == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(())
    })?;
    log::info!("deleted task {id}");
    Ok(())
}

pub fn get_task(conn: &Connection, id: i64) -> Result<Task> {
    require_task(conn, id)
}

fn last_done(conn: &Connection, id: i64) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = conn.query_row(
        "SELECT MAX(done_at) FROM task_logs WHERE task_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    Ok(raw.as_deref().and_then(parse_legacy_instant))
}

pub fn get_task_view(conn: &Connection, id: i64, now: DateTime<Utc>) -> Result<TaskView> {
    let task = require_task(conn, id)?;
    let last = last_done(conn, id)?;
    Ok(schedule::decorate(task, last, now))
}

/// Every task with its derived fields, computed against `now`.
pub fn list_tasks(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<TaskView>> {
    let mut stmt = conn.prepare(LIST_WITH_LAST_DONE)?;
    let rows = stmt.query_map([], |row| {
        let task = read_task_row(row)?;
        let last = optional_instant_col(row, 9)?;
        Ok((task, last))
    })?;
    let mut views = Vec::new();
    for row in rows {
        if let (Some(task), last) = row? {
            views.push(schedule::decorate(task, last, now));
        }
    }
    Ok(views)
}

/// Most recent completions across all tasks, newest first. `limit` is
/// capped at `LOG_PAGE_SIZE`; zero means the full page.
pub fn list_logs(conn: &Connection, limit: usize) -> Result<Vec<CompletionLog>> {
    let limit = match limit {
        0 => LOG_PAGE_SIZE,
        n => n.min(LOG_PAGE_SIZE),
    };
    let mut stmt = conn.prepare(
        "SELECT id, task_id, title, done_at FROM task_logs
         ORDER BY done_at DESC, id DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit as i64], read_log_row)?;
    let mut logs = Vec::new();
    for row in rows {
        logs.extend(row?);
    }
    Ok(logs)
}

/// Insert two sample tasks into an empty store. Returns how many were added.
pub fn seed(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
    let now = to_stored_precision(now);
    db::transaction(conn, |c| -> Result<usize> {
        let count: i64 = c.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(0);
        }
        let samples = [("Task 1", 1), ("Task 2", 7)];
        for (title, days) in samples {
            let schedule = Schedule::Recurring {
                interval_value: days,
                unit: IntervalUnit::Days,
            };
            insert_task(c, title, None, &schedule, now)?;
        }
        Ok(samples.len())
    })
}
