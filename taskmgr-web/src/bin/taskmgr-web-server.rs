use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use taskmgr::clock::SystemClock;
use taskmgr::{db, migrate, paths};
use taskmgr_web::AppState;

#[derive(Parser)]
#[command(name = "taskmgr-web-server", about = "JSON API server for taskmgr")]
struct Args {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Path to the SQLite database
    #[arg(long, env = "TASKMGR_DB_PATH")]
    db: Option<String>,

    /// Directory of static files served for non-API paths
    #[arg(long, env = "TASKMGR_STATIC_DIR")]
    static_dir: Option<PathBuf>,
}

fn prepare_store(path: &str) -> Result<()> {
    paths::ensure_db_dir(path)?;
    let conn = db::open(path).with_context(|| format!("failed to open {path}"))?;
    let report = migrate::run(&conn).context("failed to migrate database")?;
    if !report.is_noop() {
        log::info!("migrated {path}: {report:?}");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let args = Args::parse();
    let db_path = paths::db_path(args.db)?;
    prepare_store(&db_path)?;

    let state = AppState::new(db_path.as_str(), Arc::new(SystemClock));
    let app = taskmgr_web::app(state, args.static_dir);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("listening on {} (db: {db_path})", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}
