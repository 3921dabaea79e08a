use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "taskmgr", about = "Recurring and one-off task reminders", version)]
pub struct Cli {
    /// Path to the SQLite database [default: ./taskmgr.sqlite3]
    #[arg(long, env = "TASKMGR_DB_PATH", global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add a task
    Add {
        /// Task title
        title: String,
        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,
        /// Repeat every N units
        #[arg(short, long)]
        every: Option<i64>,
        /// Interval unit: hours, days, weeks, or once
        #[arg(short, long)]
        unit: Option<String>,
        /// Due instant for a one-off task (ISO-8601 with offset or Z)
        #[arg(long)]
        due: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change fields of a task; omitted fields are left alone
    Edit {
        /// Task id
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,
        /// Remove the task's notes
        #[arg(long)]
        clear_notes: bool,
        #[arg(long)]
        every: Option<i64>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        due: Option<String>,
        /// Set whether the task is active
        #[arg(long)]
        active: Option<bool>,
    },

    /// Mark a task as done now
    Done {
        /// Task id
        id: i64,
    },

    /// Remove a task and its completion log
    Rm {
        /// Task id
        id: i64,
    },

    /// Show task details
    Show {
        /// Task id
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List tasks with their next due instant
    List {
        /// Show only tasks that are due now
        #[arg(long)]
        due: bool,
        /// Include inactive tasks
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recent completions, newest first
    Logs {
        /// Maximum entries (capped at 100)
        #[arg(long, default_value_t = 100)]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add sample tasks to an empty database
    Seed,

    /// Upgrade a database written by an older version
    Migrate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_one_off_add() {
        let cli = Cli::try_parse_from([
            "taskmgr",
            "add",
            "Renew passport",
            "--unit",
            "once",
            "--due",
            "2025-09-07T18:30:00Z",
        ])
        .unwrap();
        match cli.command {
            Command::Add { title, unit, due, .. } => {
                assert_eq!(title, "Renew passport");
                assert_eq!(unit.as_deref(), Some("once"));
                assert_eq!(due.as_deref(), Some("2025-09-07T18:30:00Z"));
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn notes_and_clear_notes_conflict() {
        let res = Cli::try_parse_from(["taskmgr", "edit", "1", "--notes", "x", "--clear-notes"]);
        assert!(res.is_err());
    }
}
