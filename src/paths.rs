//! Database path resolution shared by the CLI and the web server.

use std::path::Path;

use anyhow::{Context, Result};

/// Environment variable naming the SQLite database file.
pub const DB_ENV: &str = "TASKMGR_DB_PATH";

const DEFAULT_DB_FILE: &str = "taskmgr.sqlite3";

/// Resolve the database path: an explicit value wins, then `TASKMGR_DB_PATH`,
/// then `taskmgr.sqlite3` in the working directory.
pub fn db_path(explicit: Option<String>) -> Result<String> {
    if let Some(p) = explicit.filter(|p| !p.trim().is_empty()) {
        return Ok(p);
    }
    if let Ok(p) = std::env::var(DB_ENV) {
        if !p.trim().is_empty() {
            return Ok(p);
        }
    }
    let cwd = std::env::current_dir().context("failed to read working directory")?;
    Ok(cwd
        .join(DEFAULT_DB_FILE)
        .to_str()
        .context("default DB path is not valid UTF-8")?
        .to_string())
}

pub fn ensure_db_dir(db_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let p = db_path(Some("/tmp/x.db".into())).unwrap();
        assert_eq!(p, "/tmp/x.db");
    }

    #[test]
    fn blank_explicit_path_is_ignored() {
        let p = db_path(Some("  ".into())).unwrap();
        assert!(!p.trim().is_empty());
    }

    #[test]
    fn creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("a").join("b").join("t.db");
        ensure_db_dir(db.to_str().unwrap()).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
    }

    #[test]
    fn bare_file_name_needs_no_dir() {
        ensure_db_dir("t.db").unwrap();
    }
}
