//! Text and geographic similarity primitives for duplicate clustering.
//!
//! All functions here are pure. Tokenization keeps only `[a-z0-9]` after
//! lowercasing, similarity is token-set Jaccard (frequency is ignored), and
//! distance is great-circle haversine in metres.

use std::collections::BTreeSet;

/// Mean Earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Split free text into a set of lowercase alphanumeric tokens.
///
/// Characters outside `[a-z0-9 ]` are stripped before splitting on
/// whitespace; empty tokens are dropped. Only token identity matters for
/// similarity, so the result is a set rather than a frequency map.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .map(|token| token.to_string())
        .collect()
}

/// Jaccard similarity between two token sets: |A ∩ B| / |A ∪ B|.
///
/// Returns 0.0 when the union is empty (two blank texts are not similar).
pub fn jaccard_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Great-circle distance between two lat/lng points, in metres.
///
/// Non-finite inputs propagate as a non-finite distance; callers that
/// cannot guarantee finite coordinates must guard before comparing.
pub fn haversine_distance_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}
