//! Issue intake: the creation flow the reporting endpoint drives, plus the
//! citizen upvote and authority status-change operations.
//!
//! Creation derives severity from category, computes the initial priority
//! and SLA deadline, and runs duplicate clustering. A detected duplicate
//! bumps the canonical issue's report counter and is stored clustered
//! under it. Clustering failures never block intake.

use chrono::{Duration, Utc};
use tracing::{info, warn};
use triage_core::priority::{calculate_priority, severity_for_category, sla_hours_for_severity};
use triage_db::issue_repository::{Issue, IssueRepository, IssueStatus};
use triage_db::status_log_repository::{StatusLog, StatusLogRepository};
use triage_db::{format_rfc3339, Db, DbError};

use crate::clustering::find_duplicate;
use crate::config::ClusteringConfig;

/// A citizen-submitted report before triage.
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
}

/// Create an issue: severity, initial priority, SLA deadline, duplicate
/// clustering, persistence. Returns the stored issue.
pub fn create_issue(db: &Db, cfg: &ClusteringConfig, new: NewIssue) -> Result<Issue, DbError> {
    let severity_level = severity_for_category(&new.category);
    let priority = calculate_priority(0, severity_level, 0.0, 0);
    let sla_deadline =
        Utc::now() + Duration::hours(sla_hours_for_severity(severity_level));

    let duplicate = find_duplicate(
        db,
        cfg,
        &new.title,
        &new.description,
        &new.category,
        new.location_lat,
        new.location_lng,
    );

    let repo = IssueRepository::new(db);

    let mut issue = Issue {
        title: new.title,
        description: new.description,
        category: new.category,
        location_lat: new.location_lat,
        location_lng: new.location_lng,
        status: IssueStatus::Open,
        severity_level,
        priority_score: priority.score,
        priority_label: priority.label.as_str().into(),
        sla_deadline: Some(format_rfc3339(sla_deadline)),
        ..Issue::default()
    };

    if let Some(parent) = &duplicate {
        issue.is_clustered = true;
        issue.parent_issue_id = Some(parent.id.clone());
    }

    // The parent's report bump and the clustered insert commit together;
    // a failed insert must not leave the counter half-applied.
    db.with_transaction(|| {
        if let Some(parent) = &duplicate {
            repo.increment_reports(&parent.id)?;
        }
        repo.create(&mut issue)
    })?;

    if let Some(parent) = &duplicate {
        info!(parent_id = %parent.id, "new report clustered under existing issue");
    }
    info!(
        issue_id = %issue.id,
        category = %issue.category,
        severity = issue.severity_level,
        score = issue.priority_score,
        "issue created"
    );
    Ok(issue)
}

/// Record a citizen upvote. Returns the new upvote total.
pub fn upvote_issue(db: &Db, issue_id: &str) -> Result<i64, DbError> {
    let repo = IssueRepository::new(db);
    repo.increment_upvotes(issue_id)
}

/// Apply an authority status change and append the audit entry.
///
/// The audit write is best-effort: a failure there is logged but does not
/// roll back the status change.
pub fn change_status(
    db: &Db,
    issue_id: &str,
    new_status: IssueStatus,
    changed_by: Option<&str>,
    note: &str,
) -> Result<(), DbError> {
    let repo = IssueRepository::new(db);
    let current = repo.get(issue_id)?;
    repo.update_status(issue_id, new_status)?;

    let logs = StatusLogRepository::new(db);
    let mut entry = StatusLog {
        issue_id: issue_id.into(),
        old_status: current.status.as_str().into(),
        new_status: new_status.as_str().into(),
        changed_by: changed_by.map(|s| s.to_string()),
        note: note.into(),
        ..StatusLog::default()
    };
    if let Err(err) = logs.create(&mut entry) {
        warn!(issue_id, error = %err, "status change applied but audit log write failed");
    }

    Ok(())
}
