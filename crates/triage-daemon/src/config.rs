//! Daemon configuration: defaults, YAML file loading, and validation.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default sweep cadence: escalations hourly, priorities daily.
const DEFAULT_ESCALATION_INTERVAL_SECS: u64 = 3_600;
const DEFAULT_RECOMPUTE_INTERVAL_SECS: u64 = 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Thresholds for the duplicate-clustering heuristic.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Minimum Jaccard similarity for two issues to be considered duplicates.
    pub similarity_threshold: f64,
    /// Maximum distance in metres when both issues carry coordinates.
    pub proximity_meters: f64,
    /// Only issues created within this many days are candidates.
    pub window_days: i64,
    /// Cap on the number of candidates scanned per lookup.
    pub candidate_limit: i64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.35,
            proximity_meters: 500.0,
            window_days: 30,
            candidate_limit: 100,
        }
    }
}

/// Root daemon configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Path to the SQLite database file.
    pub database_path: String,
    /// Seconds between SLA escalation sweeps.
    pub escalation_interval_secs: u64,
    /// Seconds between full priority recomputes.
    pub recompute_interval_secs: u64,
    pub clustering: ClusteringConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            database_path: "triage.db".into(),
            escalation_interval_secs: DEFAULT_ESCALATION_INTERVAL_SECS,
            recompute_interval_secs: DEFAULT_RECOMPUTE_INTERVAL_SECS,
            clustering: ClusteringConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Load from a YAML file and validate. Missing keys fall back to
    /// defaults; an unreadable or malformed file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let cfg: Self = serde_yaml::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::Invalid("database_path is required".into()));
        }
        if self.escalation_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "escalation_interval_secs must be greater than zero".into(),
            ));
        }
        if self.recompute_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "recompute_interval_secs must be greater than zero".into(),
            ));
        }

        let c = &self.clustering;
        if !(0.0..=1.0).contains(&c.similarity_threshold) {
            return Err(ConfigError::Invalid(
                "clustering.similarity_threshold must be within 0.0-1.0".into(),
            ));
        }
        if c.proximity_meters <= 0.0 {
            return Err(ConfigError::Invalid(
                "clustering.proximity_meters must be positive".into(),
            ));
        }
        if c.window_days <= 0 {
            return Err(ConfigError::Invalid(
                "clustering.window_days must be positive".into(),
            ));
        }
        if c.candidate_limit <= 0 {
            return Err(ConfigError::Invalid(
                "clustering.candidate_limit must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn escalation_interval(&self) -> Duration {
        Duration::from_secs(self.escalation_interval_secs)
    }

    pub fn recompute_interval(&self) -> Duration {
        Duration::from_secs(self.recompute_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_product_settings() {
        let cfg = DaemonConfig::default();
        assert_eq!(cfg.escalation_interval_secs, 3_600);
        assert_eq!(cfg.recompute_interval_secs, 86_400);
        assert!((cfg.clustering.similarity_threshold - 0.35).abs() < f64::EPSILON);
        assert!((cfg.clustering.proximity_meters - 500.0).abs() < f64::EPSILON);
        assert_eq!(cfg.clustering.window_days, 30);
        assert_eq!(cfg.clustering.candidate_limit, 100);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_yaml_overrides_merge_with_defaults() {
        let cfg: DaemonConfig = match serde_yaml::from_str(
            "database_path: /var/lib/triage/issues.db\nclustering:\n  proximity_meters: 250\n",
        ) {
            Ok(v) => v,
            Err(err) => panic!("parse failed: {err}"),
        };
        assert_eq!(cfg.database_path, "/var/lib/triage/issues.db");
        assert!((cfg.clustering.proximity_meters - 250.0).abs() < f64::EPSILON);
        assert_eq!(cfg.escalation_interval_secs, 3_600);
        assert!((cfg.clustering.similarity_threshold - 0.35).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = DaemonConfig::default();
        cfg.escalation_interval_secs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = DaemonConfig::default();
        cfg.clustering.similarity_threshold = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = DaemonConfig::default();
        cfg.database_path = "  ".into();
        assert!(cfg.validate().is_err());
    }
}
