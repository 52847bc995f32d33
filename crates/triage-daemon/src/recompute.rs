//! Bulk priority recompute: the daily job that re-scores every unresolved
//! issue as reports, upvotes, and age accumulate.

use chrono::Utc;
use tracing::{info, warn};
use triage_core::priority::calculate_priority;
use triage_db::issue_repository::IssueRepository;
use triage_db::{parse_rfc3339, Db, DbError};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Recompute and persist priority for every open or in-progress issue.
///
/// Age is fractional days since creation; only its floor feeds the score.
/// Each issue is independent: a failure is logged with the issue id and the
/// rest of the batch still runs. Returns the number updated.
pub fn recalculate_all_priorities(db: &Db) -> Result<usize, DbError> {
    let repo = IssueRepository::new(db);
    let issues = repo.list_unresolved()?;
    let now = Utc::now();

    let mut updated = 0usize;
    for issue in &issues {
        let created_at = match parse_rfc3339(&issue.created_at) {
            Ok(ts) => ts,
            Err(err) => {
                warn!(issue_id = %issue.id, error = %err, "skipping issue with bad created_at");
                continue;
            }
        };

        let days_unresolved = (now - created_at).num_seconds() as f64 / SECONDS_PER_DAY;
        let priority = calculate_priority(
            issue.reports_count,
            issue.severity_level,
            days_unresolved,
            issue.upvotes_count,
        );

        if let Err(err) = repo.update_priority(&issue.id, priority.score, priority.label.as_str())
        {
            warn!(issue_id = %issue.id, error = %err, "priority update failed");
            continue;
        }
        updated += 1;
    }

    info!(total = issues.len(), updated, "recalculated priorities");
    Ok(updated)
}
