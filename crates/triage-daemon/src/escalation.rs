//! SLA escalation: the hourly sweep over overdue issues and the escalated
//! listing the admin dashboard reads.

use chrono::Duration;
use tracing::{error, info};
use triage_core::priority::sla_hours_for_severity;
use triage_db::issue_repository::{Issue, IssueRepository};
use triage_db::status_log_repository::{StatusLog, StatusLogRepository};
use triage_db::{format_rfc3339, now_rfc3339, parse_rfc3339, Db, DbError};

/// Sweep all unresolved issues past their SLA deadline. For each breach:
/// bump `escalation_count`, extend the deadline by the severity's SLA
/// window, and append an audit entry. Returns the number escalated.
///
/// The extension is added to the *old* deadline, not to now. A long-unswept
/// backlog can therefore stay overdue and re-escalate on the very next
/// sweep; that compounding is intended and must not be "fixed" to extend
/// from the current time.
///
/// One issue failing is logged and skipped; the sweep continues.
pub fn check_escalations(db: &Db) -> Result<usize, DbError> {
    let now = now_rfc3339();
    let repo = IssueRepository::new(db);
    let logs = StatusLogRepository::new(db);

    let overdue = repo.list_overdue(&now)?;
    if overdue.is_empty() {
        info!("no SLA violations found");
        return Ok(0);
    }

    info!(count = overdue.len(), "processing SLA violations");

    let mut escalated = 0usize;
    for issue in overdue {
        if let Err(err) = escalate_issue(&repo, &logs, &issue) {
            error!(issue_id = %issue.id, error = %err, "escalation failed for issue");
            continue;
        }
        escalated += 1;
    }

    info!(count = escalated, "escalated issues");
    Ok(escalated)
}

fn escalate_issue(
    repo: &IssueRepository,
    logs: &StatusLogRepository,
    issue: &Issue,
) -> Result<(), DbError> {
    let old_deadline = match issue.sla_deadline.as_deref() {
        Some(deadline) => parse_rfc3339(deadline)?,
        None => return Err(DbError::Validation("overdue issue has no deadline".into())),
    };

    let sla_hours = sla_hours_for_severity(issue.severity_level);
    let new_deadline = format_rfc3339(old_deadline + Duration::hours(sla_hours));
    let breach_number = issue.escalation_count + 1;

    repo.apply_escalation(&issue.id, &new_deadline)?;

    let mut entry = StatusLog {
        issue_id: issue.id.clone(),
        old_status: issue.status.as_str().into(),
        new_status: issue.status.as_str().into(),
        changed_by: None,
        note: format!(
            "SLA breach #{breach_number}: issue past deadline. Next check at {new_deadline}"
        ),
        ..StatusLog::default()
    };
    logs.create(&mut entry)?;

    Ok(())
}

/// All issues that have breached SLA at least once, or are currently past
/// deadline and unresolved; highest priority first, earliest deadline
/// breaking ties. Pure read.
pub fn escalated_issues(db: &Db) -> Result<Vec<Issue>, DbError> {
    let repo = IssueRepository::new(db);
    repo.list_escalated(&now_rfc3339())
}
