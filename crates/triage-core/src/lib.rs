//! triage-core: pure domain logic for the civic-issue triage subsystem.
//!
//! This crate holds the side-effect-free pieces shared by the store and the
//! daemon: text/geo similarity used for duplicate clustering, and the
//! priority scoring formula with its severity and SLA lookup tables.

pub mod priority;
pub mod similarity;
