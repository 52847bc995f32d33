//! triaged: runs the recurring triage jobs against the issue store.
//!
//! Usage: `triaged [config.yaml]`. With no argument the built-in defaults
//! apply (hourly escalation sweep, daily priority recompute, `triage.db`
//! in the working directory).

use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use triage_daemon::config::DaemonConfig;
use triage_daemon::scheduler::Scheduler;
use triage_db::{Config, Db};

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = match std::env::args().nth(1) {
        Some(path) => match DaemonConfig::load(&path) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!(path = %path, error = %err, "failed to load config");
                return ExitCode::FAILURE;
            }
        },
        None => DaemonConfig::default(),
    };

    let mut db = match Db::open(Config::new(&cfg.database_path)) {
        Ok(db) => db,
        Err(err) => {
            error!(path = %cfg.database_path, error = %err, "failed to open database");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = db.migrate_up() {
        error!(error = %err, "database migration failed");
        return ExitCode::FAILURE;
    }

    let scheduler = Scheduler::new(Arc::new(Mutex::new(db)), &cfg);
    let handles = scheduler.start();
    info!(
        escalation_interval_secs = cfg.escalation_interval_secs,
        recompute_interval_secs = cfg.recompute_interval_secs,
        "triage scheduler started"
    );

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        handles.abort();
        return ExitCode::FAILURE;
    }

    info!("shutdown signal received, stopping scheduled jobs");
    handles.abort();
    ExitCode::SUCCESS
}
