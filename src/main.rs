mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;

use cli::{Cli, Command};
use taskmgr::clock::{Clock, SystemClock};
use taskmgr::model::{NewTask, TaskPatch};
use taskmgr::{db, migrate, ops, output, paths};

fn open_db(db_path: &str) -> Result<Connection> {
    db::open(db_path).with_context(|| format!("failed to open {db_path}"))
}

fn dispatch(conn: &Connection, clock: &dyn Clock, command: Command) -> Result<()> {
    match command {
        Command::Add {
            title,
            notes,
            every,
            unit,
            due,
            json,
        } => {
            let input = NewTask {
                title: Some(title),
                notes,
                interval_value: every,
                interval_unit: unit,
                due_at: due,
            };
            let now = clock.now();
            let id = ops::create_task(conn, &input, now)?;
            if json {
                let view = ops::get_task_view(conn, id, now)?;
                println!("{}", serde_json::to_string_pretty(&view)?);
            }
            eprintln!("Added task {id}");
        }

        Command::Edit {
            id,
            title,
            notes,
            clear_notes,
            every,
            unit,
            due,
            active,
        } => {
            let patch = TaskPatch {
                title,
                notes: if clear_notes { Some(None) } else { notes.map(Some) },
                interval_value: every,
                interval_unit: unit,
                due_at: due,
                is_active: active,
            };
            ops::update_task(conn, id, &patch, clock.now())?;
            eprintln!("Updated task {id}");
        }

        Command::Done { id } => {
            let log = ops::complete_task(conn, id, clock.now())?;
            eprintln!("Marked '{}' done", log.title);
        }

        Command::Rm { id } => {
            ops::delete_task(conn, id)?;
            eprintln!("Removed task {id}");
        }

        Command::Show { id, json } => {
            let view = ops::get_task_view(conn, id, clock.now())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{}", output::format_task_detail(&view));
            }
        }

        Command::List { due, all, json } => {
            let mut views = ops::list_tasks(conn, clock.now())?;
            if !all {
                views.retain(|v| v.task.is_active);
            }
            if due {
                views.retain(|v| v.is_due);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                print!("{}", output::format_task_list(&views));
            }
        }

        Command::Logs { limit, json } => {
            let logs = ops::list_logs(conn, limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&logs)?);
            } else {
                print!("{}", output::format_logs(&logs));
            }
        }

        Command::Seed => {
            let added = ops::seed(conn, clock.now())?;
            if added == 0 {
                eprintln!("Database already has tasks; nothing seeded");
            } else {
                eprintln!("Seeded {added} tasks");
            }
        }

        Command::Migrate => {
            let report = migrate::run(conn)?;
            if report.is_noop() {
                eprintln!("Schema is up to date");
            } else {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_secs()
        .init();

    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let db_path = paths::db_path(cli.db)?;
    paths::ensure_db_dir(&db_path)?;
    let conn = open_db(&db_path)?;
    if !matches!(cli.command, Command::Migrate) {
        migrate::run(&conn).context("failed to bring database schema up to date")?;
    }
    dispatch(&conn, &SystemClock, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Moves forward a day on every read.
    struct TickingClock {
        reads: AtomicI64,
    }

    impl Clock for TickingClock {
        fn now(&self) -> DateTime<Utc> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap() + Duration::days(n)
        }
    }

    #[test]
    fn add_reads_the_clock_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        let conn = db::open(path.to_str().unwrap()).unwrap();
        migrate::run(&conn).unwrap();
        let clock = TickingClock {
            reads: AtomicI64::new(0),
        };

        let cli = Cli::try_parse_from(["taskmgr", "add", "water plants", "--every", "1", "--json"])
            .unwrap();
        dispatch(&conn, &clock, cli.command).unwrap();
        assert_eq!(clock.reads.load(Ordering::SeqCst), 1);
    }
}
