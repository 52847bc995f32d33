//! triage-db: SQLite persistence for the civic-issue triage subsystem.
//!
//! One repository struct per table (`issues`, `status_logs`), a `Db` handle
//! owning the connection, and embedded schema migrations. Timestamps are
//! stored as RFC 3339 UTC strings with a uniform second-precision format so
//! lexicographic comparison in SQL orders chronologically.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use thiserror::Error;

pub mod issue_repository;
pub mod status_log_repository;

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("issue not found")]
    IssueNotFound,

    #[error("migration failed: {0}")]
    Migration(String),
}

/// Database open configuration.
#[derive(Debug, Clone)]
pub struct Config {
    path: PathBuf,
    busy_timeout_ms: u64,
}

impl Config {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout_ms: 5_000,
        }
    }

    pub fn with_busy_timeout_ms(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Owned SQLite handle. Repositories borrow this to run statements.
pub struct Db {
    conn: Connection,
}

impl Db {
    /// Open (creating if necessary) the database at the configured path and
    /// apply connection pragmas. Does not run migrations.
    pub fn open(config: Config) -> Result<Self, DbError> {
        let conn = Connection::open(config.path())?;
        conn.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database. Used by tests that do not need a file.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside a transaction on this connection. Commits on `Ok`;
    /// any error rolls back every write made inside the closure.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce() -> Result<T, DbError>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let out = f()?;
        tx.commit()?;
        Ok(out)
    }

    /// Apply all pending schema migrations in order.
    pub fn migrate_up(&mut self) -> Result<(), DbError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        for (version, sql) in MIGRATIONS {
            let applied: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )?;
            if applied > 0 {
                continue;
            }

            let tx = self.conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| DbError::Migration(format!("migration {version}: {e}")))?;
            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_rfc3339()],
            )?;
            tx.commit()?;
        }

        Ok(())
    }
}

const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    "CREATE TABLE issues (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        category TEXT NOT NULL,
        location_lat REAL,
        location_lng REAL,
        status TEXT NOT NULL DEFAULT 'open',
        severity_level INTEGER NOT NULL DEFAULT 1,
        priority_score INTEGER NOT NULL DEFAULT 0,
        priority_label TEXT NOT NULL DEFAULT 'Low',
        reports_count INTEGER NOT NULL DEFAULT 0,
        upvotes_count INTEGER NOT NULL DEFAULT 0,
        escalation_count INTEGER NOT NULL DEFAULT 0,
        sla_deadline TEXT,
        is_clustered INTEGER NOT NULL DEFAULT 0,
        parent_issue_id TEXT REFERENCES issues(id),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        resolved_at TEXT
    );

    CREATE INDEX idx_issues_category_status ON issues(category, status);
    CREATE INDEX idx_issues_sla_deadline ON issues(sla_deadline);
    CREATE INDEX idx_issues_created_at ON issues(created_at);

    CREATE TABLE status_logs (
        id TEXT PRIMARY KEY,
        issue_id TEXT NOT NULL REFERENCES issues(id),
        old_status TEXT NOT NULL,
        new_status TEXT NOT NULL,
        changed_by TEXT,
        note TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX idx_status_logs_issue ON status_logs(issue_id);",
)];

/// Current UTC time as an RFC 3339 string, second precision, `Z` suffix.
///
/// Every timestamp written by this crate goes through this formatter (or
/// [`format_rfc3339`]) so string comparison in SQL matches time order.
pub fn now_rfc3339() -> String {
    format_rfc3339(Utc::now())
}

/// Format a UTC timestamp in the crate's canonical RFC 3339 form.
pub fn format_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a timestamp previously written by this crate.
pub fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Validation(format!("invalid timestamp {value:?}: {e}")))
}
