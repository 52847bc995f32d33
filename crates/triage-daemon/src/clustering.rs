//! Duplicate clustering: decide whether a newly reported issue duplicates
//! an existing unresolved issue in the same category and vicinity.
//!
//! The heuristic is a bounded linear scan over recent candidates with a
//! bag-of-words Jaccard gate and an optional proximity gate. The first
//! qualifying candidate in recency order wins; there is no best-match
//! search. Whether first-match should become best-match is an open tuning
//! question, so the behavior is kept as shipped.

use chrono::{Duration, Utc};
use tracing::{debug, warn};
use triage_core::similarity::{haversine_distance_m, jaccard_similarity, tokenize};
use triage_db::issue_repository::{Issue, IssueRepository};
use triage_db::{format_rfc3339, Db};

use crate::config::ClusteringConfig;

/// Find an existing issue the new report duplicates, if any.
///
/// Candidates are same-category open/in-progress issues that are not
/// themselves duplicates, created within the configured window, scanned
/// most-recent-first up to the configured cap. A candidate matches when
/// its title+description Jaccard similarity reaches the threshold and,
/// when both sides have finite coordinates, it lies within the proximity
/// radius. Missing or non-finite coordinates skip the distance gate.
///
/// Store read failures are logged and reported as "no duplicate" so issue
/// intake never fails because clustering could not run.
pub fn find_duplicate(
    db: &Db,
    cfg: &ClusteringConfig,
    title: &str,
    description: &str,
    category: &str,
    lat: Option<f64>,
    lng: Option<f64>,
) -> Option<Issue> {
    let cutoff = format_rfc3339(Utc::now() - Duration::days(cfg.window_days));
    let repo = IssueRepository::new(db);

    let candidates = match repo.duplicate_candidates(category, &cutoff, cfg.candidate_limit) {
        Ok(candidates) => candidates,
        Err(err) => {
            warn!(category, error = %err, "duplicate candidate read failed, treating as no match");
            return None;
        }
    };

    if candidates.is_empty() {
        return None;
    }

    let new_location = match (lat, lng) {
        (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
        _ => None,
    };
    let new_tokens = tokenize(&format!("{title} {description}"));

    for candidate in candidates {
        let candidate_tokens = tokenize(&format!(
            "{} {}",
            candidate.title, candidate.description
        ));

        let similarity = jaccard_similarity(&new_tokens, &candidate_tokens);
        if similarity < cfg.similarity_threshold {
            continue;
        }

        if let (Some((lat, lng)), Some((c_lat, c_lng))) = (new_location, candidate.coordinates()) {
            let distance = haversine_distance_m(lat, lng, c_lat, c_lng);
            if distance > cfg.proximity_meters {
                continue;
            }
        }

        debug!(
            candidate_id = %candidate.id,
            similarity,
            "duplicate issue matched"
        );
        return Some(candidate);
    }

    None
}
