//! Recurring scheduler: two independent tokio interval tasks, one for the
//! SLA escalation sweep and one for the full priority recompute.
//!
//! Each tick's body is isolated; a failing run is logged and the schedule
//! keeps ticking. Job bodies lock the shared database handle, so a run
//! that outlasts its interval serializes with the next one instead of
//! racing it.
//!
//! Intervals are fixed periods measured from process start, not aligned
//! to the wall clock: the default daily recompute runs every 86 400
//! seconds, not at midnight, so its run time drifts with restarts.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use triage_db::{Db, DbError};

use crate::config::DaemonConfig;
use crate::{escalation, recompute};

/// Database handle shared between the scheduler tasks and any other caller.
pub type SharedDb = Arc<Mutex<Db>>;

/// Lock the shared handle, recovering the guard if a previous holder
/// panicked mid-write.
pub fn lock_db(db: &SharedDb) -> MutexGuard<'_, Db> {
    match db.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Handles to the two running schedule tasks.
pub struct SchedulerHandles {
    pub escalation: JoinHandle<()>,
    pub recompute: JoinHandle<()>,
}

impl SchedulerHandles {
    pub fn abort(&self) {
        self.escalation.abort();
        self.recompute.abort();
    }
}

/// Spawns and owns the recurring triage jobs.
pub struct Scheduler {
    db: SharedDb,
    escalation_interval: Duration,
    recompute_interval: Duration,
}

impl Scheduler {
    pub fn new(db: SharedDb, cfg: &DaemonConfig) -> Self {
        Self {
            db,
            escalation_interval: cfg.escalation_interval(),
            recompute_interval: cfg.recompute_interval(),
        }
    }

    /// Spawn both schedules. The returned handles outlive the scheduler;
    /// dropping them does not stop the tasks, aborting does.
    pub fn start(&self) -> SchedulerHandles {
        let escalation = {
            let db = Arc::clone(&self.db);
            spawn_recurring("escalation_sweep", self.escalation_interval, move || {
                let guard = lock_db(&db);
                escalation::check_escalations(&guard).map(|_| ())
            })
        };

        let recompute = {
            let db = Arc::clone(&self.db);
            spawn_recurring("priority_recompute", self.recompute_interval, move || {
                let guard = lock_db(&db);
                recompute::recalculate_all_priorities(&guard).map(|_| ())
            })
        };

        SchedulerHandles {
            escalation,
            recompute,
        }
    }
}

/// Run `job` every `period`, forever. Errors are logged against the task
/// name and never cancel the schedule.
pub fn spawn_recurring<F>(task: &'static str, period: Duration, mut job: F) -> JoinHandle<()>
where
    F: FnMut() -> Result<(), DbError> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // A tokio interval's first tick completes immediately; skip it so
        // the first run lands one full period after startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            info!(task, "running scheduled job");
            if let Err(err) = job() {
                error!(task, error = %err, "scheduled job failed");
            }
        }
    })
}
