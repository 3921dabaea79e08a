//! One-time, idempotent upgrade of databases written by older versions.
//!
//! Older stores lack the `due_at` and `task_logs.title` columns and hold
//! naive or double-suffixed timestamps (`2025-09-07 18:30:00.123456`,
//! `2025-09-07T18:30:00+00:00Z`). This pass adds the columns, backfills log
//! titles and rewrites every readable timestamp into canonical form. Rows
//! whose timestamps cannot be read are left as they are; readers fall
//! back or skip them.

use rusqlite::Connection;
use serde::Serialize;

use crate::db;
use crate::error::Result;
use crate::timefmt::{format_instant, parse_legacy_instant};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub columns_added: Vec<String>,
    pub titles_backfilled: usize,
    pub timestamps_rewritten: usize,
    pub rows_skipped: usize,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.columns_added.is_empty() && self.titles_backfilled == 0 && self.timestamps_rewritten == 0
    }
}

const TIMESTAMP_COLUMNS: &[(&str, &str)] = &[
    ("tasks", "created_at"),
    ("tasks", "updated_at"),
    ("tasks", "due_at"),
    ("task_logs", "done_at"),
];

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        [table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    decl: &str,
    report: &mut MigrationReport,
) -> Result<()> {
    if has_column(conn, table, column)? {
        return Ok(());
    }
    conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"))?;
    log::info!("added column {table}.{column}");
    report.columns_added.push(format!("{table}.{column}"));
    Ok(())
}

fn normalize_column(
    conn: &Connection,
    table: &str,
    column: &str,
    report: &mut MigrationReport,
) -> Result<()> {
    let rows: Vec<(i64, String)> = {
        let mut stmt = conn.prepare(&format!(
            "SELECT id, {column} FROM {table} WHERE {column} IS NOT NULL"
        ))?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    let update = format!("UPDATE {table} SET {column} = ?1 WHERE id = ?2");
    for (id, raw) in rows {
        let Some(parsed) = parse_legacy_instant(&raw) else {
            log::warn!("skipping {table}.{column} for id {id}: unreadable timestamp '{raw}'");
            report.rows_skipped += 1;
            continue;
        };
        let canonical = format_instant(parsed);
        if canonical != raw {
            conn.execute(&update, rusqlite::params![canonical, id])?;
            report.timestamps_rewritten += 1;
        }
    }
    Ok(())
}

/// Bring `conn` up to the current schema. Safe to run on every start.
pub fn run(conn: &Connection) -> Result<MigrationReport> {
    db::init(conn)?;
    let report = db::transaction(conn, |c| -> Result<MigrationReport> {
        let mut report = MigrationReport::default();
        add_column_if_missing(c, "tasks", "notes", "TEXT", &mut report)?;
        add_column_if_missing(c, "tasks", "due_at", "TEXT", &mut report)?;
        add_column_if_missing(c, "task_logs", "title", "TEXT", &mut report)?;

        report.titles_backfilled = c.execute(
            "UPDATE task_logs
             SET title = (SELECT t.title FROM tasks t WHERE t.id = task_logs.task_id)
             WHERE title IS NULL
               AND EXISTS (SELECT 1 FROM tasks t WHERE t.id = task_logs.task_id)",
            [],
        )?;

        for (table, column) in TIMESTAMP_COLUMNS {
            normalize_column(c, table, column, &mut report)?;
        }
        Ok(report)
    })?;

    if report.is_noop() {
        log::debug!("schema up to date");
    } else {
        log::info!(
            "migration: {} column(s) added, {} title(s) backfilled, {} timestamp(s) rewritten, {} row(s) skipped",
            report.columns_added.len(),
            report.titles_backfilled,
            report.timestamps_rewritten,
            report.rows_skipped
        );
    }
    Ok(report)
}
