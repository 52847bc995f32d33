//! Issue repository — persistence for the `issues` table.
//!
//! Counter columns (`reports_count`, `upvotes_count`, `escalation_count`)
//! are only ever mutated through single `SET col = col + 1` statements so
//! concurrent writers cannot lose updates.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::{now_rfc3339, Db, DbError};

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Issue lifecycle status. Transitions are written by callers; this layer
/// does not enforce forward-only movement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IssueStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DbError> {
        match value {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            other => Err(DbError::Validation(format!(
                "invalid issue status: {other}"
            ))),
        }
    }
}

/// A citizen-reported issue as seen by the triage subsystem.
#[derive(Debug, Clone, Default)]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub status: IssueStatus,
    pub severity_level: i64,
    pub priority_score: i64,
    pub priority_label: String,
    pub reports_count: i64,
    pub upvotes_count: i64,
    pub escalation_count: i64,
    pub sla_deadline: Option<String>,
    pub is_clustered: bool,
    pub parent_issue_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub resolved_at: Option<String>,
}

impl Issue {
    /// Coordinates if both components are present and finite.
    ///
    /// A half-set or non-finite pair counts as "no location available", so
    /// distance checks are skipped rather than comparing against NaN.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.location_lat, self.location_lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// IssueRepository
// ---------------------------------------------------------------------------

const ISSUE_COLUMNS: &str = "id, title, description, category,
    location_lat, location_lng, status, severity_level,
    priority_score, priority_label, reports_count, upvotes_count,
    escalation_count, sla_deadline, is_clustered, parent_issue_id,
    created_at, updated_at, resolved_at";

pub struct IssueRepository<'a> {
    db: &'a Db,
}

impl<'a> IssueRepository<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// Insert a new issue. Fills `id`, `created_at`, and `updated_at` when
    /// unset. Non-finite coordinates are stored as NULL.
    pub fn create(&self, issue: &mut Issue) -> Result<(), DbError> {
        if issue.title.trim().is_empty() {
            return Err(DbError::Validation("issue title is required".into()));
        }
        if issue.category.trim().is_empty() {
            return Err(DbError::Validation("issue category is required".into()));
        }
        if !(1..=4).contains(&issue.severity_level) {
            return Err(DbError::Validation(format!(
                "severity_level must be 1-4, got {}",
                issue.severity_level
            )));
        }

        if issue.id.is_empty() {
            issue.id = Uuid::new_v4().to_string();
        }
        if issue.created_at.is_empty() {
            issue.created_at = now_rfc3339();
        }
        issue.updated_at = issue.created_at.clone();

        let (lat, lng) = match issue.coordinates() {
            Some((lat, lng)) => (Some(lat), Some(lng)),
            None => (None, None),
        };

        self.db.conn().execute(
            "INSERT INTO issues (
                id, title, description, category,
                location_lat, location_lng, status, severity_level,
                priority_score, priority_label, reports_count, upvotes_count,
                escalation_count, sla_deadline, is_clustered, parent_issue_id,
                created_at, updated_at, resolved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                      ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                issue.id,
                issue.title,
                issue.description,
                issue.category,
                lat,
                lng,
                issue.status.as_str(),
                issue.severity_level,
                issue.priority_score,
                issue.priority_label,
                issue.reports_count,
                issue.upvotes_count,
                issue.escalation_count,
                issue.sla_deadline,
                issue.is_clustered as i64,
                issue.parent_issue_id,
                issue.created_at,
                issue.updated_at,
                issue.resolved_at,
            ],
        )?;

        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Issue, DbError> {
        let result = self
            .db
            .conn()
            .query_row(
                &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1"),
                params![id],
                scan_issue,
            )
            .optional()?;

        result.ok_or(DbError::IssueNotFound)
    }

    /// Candidate pool for duplicate clustering: same category, still
    /// unresolved, not itself a duplicate, created at or after the cutoff.
    /// Most recent first, capped at `limit`.
    pub fn duplicate_candidates(
        &self,
        category: &str,
        created_after: &str,
        limit: i64,
    ) -> Result<Vec<Issue>, DbError> {
        let mut stmt = self.db.conn().prepare(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues
            WHERE category = ?1
              AND status IN ('open', 'in_progress')
              AND is_clustered = 0
              AND created_at >= ?2
            ORDER BY created_at DESC
            LIMIT ?3"
        ))?;

        let rows = stmt.query_map(params![category, created_after, limit], scan_issue)?;
        collect_issues(rows)
    }

    /// All open or in-progress issues, oldest first.
    pub fn list_unresolved(&self) -> Result<Vec<Issue>, DbError> {
        let mut stmt = self.db.conn().prepare(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues
            WHERE status IN ('open', 'in_progress')
            ORDER BY created_at ASC"
        ))?;

        let rows = stmt.query_map([], scan_issue)?;
        collect_issues(rows)
    }

    /// Unresolved issues whose SLA deadline has passed as of `now`.
    pub fn list_overdue(&self, now: &str) -> Result<Vec<Issue>, DbError> {
        let mut stmt = self.db.conn().prepare(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues
            WHERE status IN ('open', 'in_progress')
              AND sla_deadline IS NOT NULL
              AND sla_deadline < ?1
            ORDER BY sla_deadline ASC"
        ))?;

        let rows = stmt.query_map(params![now], scan_issue)?;
        collect_issues(rows)
    }

    /// Issues that have breached SLA at least once, or are currently past
    /// deadline and unresolved. Highest priority first, earliest deadline
    /// breaking ties.
    pub fn list_escalated(&self, now: &str) -> Result<Vec<Issue>, DbError> {
        let mut stmt = self.db.conn().prepare(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues
            WHERE escalation_count > 0
               OR (sla_deadline IS NOT NULL
                   AND sla_deadline < ?1
                   AND status != 'resolved')
            ORDER BY priority_score DESC, sla_deadline ASC"
        ))?;

        let rows = stmt.query_map(params![now], scan_issue)?;
        collect_issues(rows)
    }

    /// Atomically bump `reports_count` by one.
    pub fn increment_reports(&self, id: &str) -> Result<(), DbError> {
        let rows = self.db.conn().execute(
            "UPDATE issues
            SET reports_count = reports_count + 1, updated_at = ?1
            WHERE id = ?2",
            params![now_rfc3339(), id],
        )?;
        if rows == 0 {
            return Err(DbError::IssueNotFound);
        }
        Ok(())
    }

    /// Atomically bump `upvotes_count` by one.
    pub fn increment_upvotes(&self, id: &str) -> Result<i64, DbError> {
        let rows = self.db.conn().execute(
            "UPDATE issues
            SET upvotes_count = upvotes_count + 1, updated_at = ?1
            WHERE id = ?2",
            params![now_rfc3339(), id],
        )?;
        if rows == 0 {
            return Err(DbError::IssueNotFound);
        }

        let count: i64 = self.db.conn().query_row(
            "SELECT upvotes_count FROM issues WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Record an SLA breach: atomic escalation increment plus the extended
    /// deadline, in one statement.
    pub fn apply_escalation(&self, id: &str, new_deadline: &str) -> Result<(), DbError> {
        let rows = self.db.conn().execute(
            "UPDATE issues
            SET escalation_count = escalation_count + 1,
                sla_deadline = ?1,
                updated_at = ?2
            WHERE id = ?3",
            params![new_deadline, now_rfc3339(), id],
        )?;
        if rows == 0 {
            return Err(DbError::IssueNotFound);
        }
        Ok(())
    }

    /// Persist a recomputed priority score and label.
    pub fn update_priority(&self, id: &str, score: i64, label: &str) -> Result<(), DbError> {
        let rows = self.db.conn().execute(
            "UPDATE issues
            SET priority_score = ?1, priority_label = ?2, updated_at = ?3
            WHERE id = ?4",
            params![score, label, now_rfc3339(), id],
        )?;
        if rows == 0 {
            return Err(DbError::IssueNotFound);
        }
        Ok(())
    }

    /// Write a status transition. Sets `resolved_at` when moving to
    /// resolved; leaves it untouched otherwise.
    pub fn update_status(&self, id: &str, status: IssueStatus) -> Result<(), DbError> {
        let now = now_rfc3339();
        let rows = if status == IssueStatus::Resolved {
            self.db.conn().execute(
                "UPDATE issues
                SET status = ?1, resolved_at = ?2, updated_at = ?2
                WHERE id = ?3",
                params![status.as_str(), now, id],
            )?
        } else {
            self.db.conn().execute(
                "UPDATE issues SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now, id],
            )?
        };
        if rows == 0 {
            return Err(DbError::IssueNotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row scanner
// ---------------------------------------------------------------------------

fn scan_issue(row: &rusqlite::Row) -> rusqlite::Result<Issue> {
    let status_str: String = row.get(6)?;
    let is_clustered: i64 = row.get(14)?;

    Ok(Issue {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        location_lat: row.get(4)?,
        location_lng: row.get(5)?,
        status: IssueStatus::parse(&status_str).unwrap_or_default(),
        severity_level: row.get(7)?,
        priority_score: row.get(8)?,
        priority_label: row.get(9)?,
        reports_count: row.get(10)?,
        upvotes_count: row.get(11)?,
        escalation_count: row.get(12)?,
        sla_deadline: row.get(13)?,
        is_clustered: is_clustered != 0,
        parent_issue_id: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
        resolved_at: row.get(18)?,
    })
}

fn collect_issues(
    rows: impl Iterator<Item = rusqlite::Result<Issue>>,
) -> Result<Vec<Issue>, DbError> {
    let mut issues = Vec::new();
    for row in rows {
        issues.push(row?);
    }
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_migrated() -> Db {
        let mut db = match Db::open_in_memory() {
            Ok(db) => db,
            Err(err) => panic!("open failed: {err}"),
        };
        if let Err(err) = db.migrate_up() {
            panic!("migrate failed: {err}");
        }
        db
    }

    #[test]
    fn create_rejects_blank_title() {
        let db = open_migrated();
        let repo = IssueRepository::new(&db);
        let mut issue = Issue {
            title: "   ".into(),
            category: "roads".into(),
            severity_level: 2,
            ..Issue::default()
        };
        assert!(matches!(
            repo.create(&mut issue),
            Err(DbError::Validation(_))
        ));
    }

    #[test]
    fn create_rejects_out_of_range_severity() {
        let db = open_migrated();
        let repo = IssueRepository::new(&db);
        let mut issue = Issue {
            title: "Pothole".into(),
            description: "deep one".into(),
            category: "roads".into(),
            severity_level: 7,
            ..Issue::default()
        };
        assert!(matches!(
            repo.create(&mut issue),
            Err(DbError::Validation(_))
        ));
    }

    #[test]
    fn non_finite_coordinates_stored_as_null() {
        let db = open_migrated();
        let repo = IssueRepository::new(&db);
        let mut issue = Issue {
            title: "Pothole".into(),
            description: "deep one".into(),
            category: "roads".into(),
            severity_level: 2,
            priority_label: "Low".into(),
            location_lat: Some(f64::NAN),
            location_lng: Some(77.59),
            ..Issue::default()
        };
        if let Err(err) = repo.create(&mut issue) {
            panic!("create failed: {err}");
        }

        let stored = match repo.get(&issue.id) {
            Ok(v) => v,
            Err(err) => panic!("get failed: {err}"),
        };
        assert_eq!(stored.location_lat, None);
        assert_eq!(stored.location_lng, None);
        assert_eq!(stored.coordinates(), None);
    }

    #[test]
    fn status_round_trips() {
        for status in [
            IssueStatus::Open,
            IssueStatus::InProgress,
            IssueStatus::Resolved,
        ] {
            let parsed = match IssueStatus::parse(status.as_str()) {
                Ok(v) => v,
                Err(err) => panic!("parse failed: {err}"),
            };
            assert_eq!(parsed, status);
        }
        assert!(IssueStatus::parse("closed").is_err());
    }
}
