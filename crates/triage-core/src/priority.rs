//! Priority scoring: severity lookup, the score formula, label thresholds,
//! and the per-severity SLA interval table.

/// Default severity for categories missing from the lookup table.
const DEFAULT_SEVERITY: i64 = 1;

/// Default SLA window in hours when severity is out of range.
const DEFAULT_SLA_HOURS: i64 = 72;

/// Priority label derived from the score thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriorityLabel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl PriorityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Low" => Some(Self::Low),
            "Medium" => Some(Self::Medium),
            "High" => Some(Self::High),
            "Critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// A computed priority: the raw score and the label its range maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityScore {
    pub score: i64,
    pub label: PriorityLabel,
}

/// Severity level (1–4) for an issue category; unknown categories are 1.
///
/// Fixed at creation time — severity never changes over an issue's life.
pub fn severity_for_category(category: &str) -> i64 {
    match category {
        "public_safety" => 4,
        "electricity" | "water" | "environment" | "building" => 3,
        "roads" | "sanitation" | "noise" => 2,
        "parks" | "other" => 1,
        _ => DEFAULT_SEVERITY,
    }
}

/// SLA window in hours for a severity level: 1→72, 2→48, 3→24, 4→12.
pub fn sla_hours_for_severity(severity_level: i64) -> i64 {
    match severity_level {
        1 => 72,
        2 => 48,
        3 => 24,
        4 => 12,
        _ => DEFAULT_SLA_HOURS,
    }
}

/// Compute the priority score and label for an issue.
///
/// score = reports_count * 2 + severity_level * 10
///       + floor(days_unresolved) + upvotes_count
///
/// Only whole elapsed days contribute; the fractional part of
/// `days_unresolved` is discarded. Negative ages clamp to zero so a skewed
/// clock cannot produce a negative contribution.
pub fn calculate_priority(
    reports_count: i64,
    severity_level: i64,
    days_unresolved: f64,
    upvotes_count: i64,
) -> PriorityScore {
    let age_days = if days_unresolved.is_finite() && days_unresolved > 0.0 {
        days_unresolved.floor() as i64
    } else {
        0
    };

    let score = reports_count * 2 + severity_level * 10 + age_days + upvotes_count;

    let label = if score <= 20 {
        PriorityLabel::Low
    } else if score <= 50 {
        PriorityLabel::Medium
    } else if score <= 100 {
        PriorityLabel::High
    } else {
        PriorityLabel::Critical
    };

    PriorityScore { score, label }
}
