//! triage-daemon: service layer and recurring jobs for civic-issue triage.
//!
//! Exposes the operations the HTTP layer calls into (duplicate clustering,
//! issue intake, priority recompute, SLA escalation) plus the scheduler
//! that drives the recurring sweeps. The `triaged` binary wires config,
//! logging, the database, and the scheduler together.

pub mod clustering;
pub mod config;
pub mod escalation;
pub mod intake;
pub mod recompute;
pub mod scheduler;
