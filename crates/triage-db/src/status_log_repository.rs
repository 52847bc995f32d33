//! Status log repository — append-only audit trail for the `status_logs`
//! table. SLA breach records keep `old_status == new_status` with no actor.

use rusqlite::params;
use uuid::Uuid;

use crate::{now_rfc3339, Db, DbError};

/// One audit entry for an issue: a status transition or an SLA breach note.
#[derive(Debug, Clone, Default)]
pub struct StatusLog {
    pub id: String,
    pub issue_id: String,
    pub old_status: String,
    pub new_status: String,
    /// User identifier of the actor; `None` for system-generated entries.
    pub changed_by: Option<String>,
    pub note: String,
    pub created_at: String,
}

pub struct StatusLogRepository<'a> {
    db: &'a Db,
}

impl<'a> StatusLogRepository<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// Append an audit entry. Fills `id` and `created_at` when unset.
    pub fn create(&self, log: &mut StatusLog) -> Result<(), DbError> {
        if log.issue_id.trim().is_empty() {
            return Err(DbError::Validation("status log issue_id is required".into()));
        }
        if log.note.trim().is_empty() {
            return Err(DbError::Validation("status log note is required".into()));
        }

        if log.id.is_empty() {
            log.id = Uuid::new_v4().to_string();
        }
        if log.created_at.is_empty() {
            log.created_at = now_rfc3339();
        }

        self.db.conn().execute(
            "INSERT INTO status_logs (
                id, issue_id, old_status, new_status, changed_by, note, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                log.id,
                log.issue_id,
                log.old_status,
                log.new_status,
                log.changed_by,
                log.note,
                log.created_at,
            ],
        )?;

        Ok(())
    }

    /// All entries for an issue, newest first.
    pub fn list_by_issue(&self, issue_id: &str) -> Result<Vec<StatusLog>, DbError> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, issue_id, old_status, new_status, changed_by, note, created_at
            FROM status_logs
            WHERE issue_id = ?1
            ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt.query_map(params![issue_id], scan_status_log)?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }
}

fn scan_status_log(row: &rusqlite::Row) -> rusqlite::Result<StatusLog> {
    Ok(StatusLog {
        id: row.get(0)?,
        issue_id: row.get(1)?,
        old_status: row.get(2)?,
        new_status: row.get(3)?,
        changed_by: row.get(4)?,
        note: row.get(5)?,
        created_at: row.get(6)?,
    })
}
