use rusqlite::Connection;

use crate::error::Result;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id          INTEGER PRIMARY KEY,
    title       TEXT NOT NULL,
    notes       TEXT,
    freq_value  INTEGER NOT NULL DEFAULT 1,
    freq_unit   TEXT NOT NULL DEFAULT 'days',
    is_active   INTEGER NOT NULL DEFAULT 1,
    due_at      TEXT,
    created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE TABLE IF NOT EXISTS task_logs (
    id       INTEGER PRIMARY KEY,
    task_id  INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    title    TEXT,
    done_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE INDEX IF NOT EXISTS task_logs_task_id ON task_logs(task_id);
";

fn set_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    set_pragmas(&conn)?;
    Ok(conn)
}

pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Run `f` atomically.
///
/// At the top level this takes the write lock up front (`BEGIN IMMEDIATE`)
/// so a read-modify-write cannot interleave with another writer. When a
/// transaction is already open it nests with a SAVEPOINT instead.
pub fn transaction<T, E>(conn: &Connection, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
where
    E: From<rusqlite::Error>,
{
    let nested = !conn.is_autocommit();
    let (begin, commit, rollback) = if nested {
        ("SAVEPOINT op", "RELEASE op", "ROLLBACK TO op; RELEASE op")
    } else {
        ("BEGIN IMMEDIATE", "COMMIT", "ROLLBACK")
    };

    conn.execute_batch(begin)?;
    let result = f(conn).and_then(|v| {
        conn.execute_batch(commit)?;
        Ok(v)
    });
    if result.is_err() {
        let _ = conn.execute_batch(rollback);
    }
    result
}

#[cfg(test)]
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    set_pragmas(&conn)?;
    init(&conn)?;
    Ok(conn)
}
