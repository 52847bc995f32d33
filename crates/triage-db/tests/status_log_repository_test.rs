use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use triage_db::issue_repository::{Issue, IssueRepository};
use triage_db::status_log_repository::{StatusLog, StatusLogRepository};
use triage_db::{Config, Db};

fn temp_db_path(tag: &str) -> PathBuf {
    static UNIQUE_SUFFIX: AtomicU64 = AtomicU64::new(0);
    let nanos = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_nanos(),
        Err(_) => 0,
    };
    let suffix = UNIQUE_SUFFIX.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "triage-db-status-log-{tag}-{nanos}-{}-{suffix}.sqlite",
        std::process::id(),
    ))
}

fn setup_db(tag: &str) -> (Db, PathBuf) {
    let path = temp_db_path(tag);
    let _ = std::fs::remove_file(&path);
    let mut db = match Db::open(Config::new(&path)) {
        Ok(db) => db,
        Err(err) => panic!("open db failed: {err}"),
    };
    if let Err(err) = db.migrate_up() {
        panic!("migrate_up failed: {err}");
    }
    (db, path)
}

fn seed_issue(db: &Db) -> String {
    let repo = IssueRepository::new(db);
    let mut issue = Issue {
        title: "Fallen tree blocking lane".into(),
        description: "large branch across the road".into(),
        category: "environment".into(),
        severity_level: 3,
        priority_label: "Medium".into(),
        ..Issue::default()
    };
    if let Err(err) = repo.create(&mut issue) {
        panic!("seed issue failed: {err}");
    }
    issue.id
}

#[test]
fn create_and_list_newest_first() {
    let (db, path) = setup_db("list");
    let issue_id = seed_issue(&db);
    let repo = StatusLogRepository::new(&db);

    let mut first = StatusLog {
        issue_id: issue_id.clone(),
        old_status: "open".into(),
        new_status: "open".into(),
        changed_by: None,
        note: "SLA breach #1: issue past deadline. Next check at 2026-08-26T00:00:00Z".into(),
        created_at: "2026-08-25T01:00:00Z".into(),
        ..StatusLog::default()
    };
    if let Err(err) = repo.create(&mut first) {
        panic!("create failed: {err}");
    }

    let mut second = StatusLog {
        issue_id: issue_id.clone(),
        old_status: "open".into(),
        new_status: "in_progress".into(),
        changed_by: Some("authority-7".into()),
        note: "crew dispatched".into(),
        created_at: "2026-08-25T02:00:00Z".into(),
        ..StatusLog::default()
    };
    if let Err(err) = repo.create(&mut second) {
        panic!("create failed: {err}");
    }

    let logs = match repo.list_by_issue(&issue_id) {
        Ok(v) => v,
        Err(err) => panic!("list_by_issue failed: {err}"),
    };
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].note, "crew dispatched");
    assert_eq!(logs[0].changed_by.as_deref(), Some("authority-7"));
    assert_eq!(logs[1].old_status, "open");
    assert_eq!(logs[1].new_status, "open");
    assert_eq!(logs[1].changed_by, None);

    cleanup(&path);
}

#[test]
fn list_for_unknown_issue_is_empty() {
    let (db, path) = setup_db("empty");
    let repo = StatusLogRepository::new(&db);
    let logs = match repo.list_by_issue("no-such-issue") {
        Ok(v) => v,
        Err(err) => panic!("list_by_issue failed: {err}"),
    };
    assert!(logs.is_empty());
    cleanup(&path);
}

fn cleanup(path: &PathBuf) {
    let _ = std::fs::remove_file(path);
    let _ = std::fs::remove_file(path.with_extension("sqlite-wal"));
    let _ = std::fs::remove_file(path.with_extension("sqlite-shm"));
}
