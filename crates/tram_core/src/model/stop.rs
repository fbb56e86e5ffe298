//! Stop and stop-connection records.
//!
//! # Invariants
//! - `Stop::slug` is the canonical form of `Stop::name` (see [`slugify`]).
//! - Connections are undirected: `(a, b)` and `(b, a)` describe the same edge.

use crate::model::issue::ValidationIssue;
use crate::model::route::RouteSummary;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Store-assigned stop identifier.
pub type StopId = i64;

/// Store-assigned connection (edge) identifier.
pub type ConnectionId = i64;

/// Traversal time used when a connection is created without one.
pub const DEFAULT_TRAVEL_TIME_MINUTES: u32 = 2;

/// Longest accepted stop name, in characters.
pub const STOP_NAME_MAX_CHARS: usize = 100;

static SLUG_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid slug separator regex"));

/// Named point in the transit network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub slug: String,
}

/// Undirected, weighted link between two stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopConnection {
    pub id: ConnectionId,
    pub stop_a: StopId,
    pub stop_b: StopId,
    /// Positive number of minutes.
    pub travel_time_minutes: u32,
}

impl StopConnection {
    /// Returns whether this edge links `first` and `second` in either direction.
    pub fn joins(&self, first: StopId, second: StopId) -> bool {
        (self.stop_a == first && self.stop_b == second)
            || (self.stop_a == second && self.stop_b == first)
    }
}

/// A stop one hop away from another stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Neighbor {
    pub connection_id: ConnectionId,
    pub stop: Stop,
    pub travel_time_minutes: u32,
}

/// Stop detail read: the stop plus every route passing through it.
///
/// `routes` is distinct and ordered by route id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopDetail {
    pub id: StopId,
    pub name: String,
    pub slug: String,
    pub routes: Vec<RouteSummary>,
}

impl StopDetail {
    pub fn new(stop: Stop, routes: Vec<RouteSummary>) -> Self {
        Self {
            id: stop.id,
            name: stop.name,
            slug: stop.slug,
            routes,
        }
    }
}

/// Canonicalizes a stop name into its URL-safe key.
///
/// Lowercases, turns every run of whitespace/punctuation into a single `-`
/// and strips leading/trailing separators. Two names that differ only by
/// formatting (`"Main St"`, `"main  st."`) produce the same slug.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    SLUG_SEPARATOR_RE
        .replace_all(lowered.as_str(), "-")
        .trim_matches('-')
        .to_string()
}

/// Trims a requested stop name and checks it can carry a slug.
///
/// Returns `(name, slug)` on success.
pub fn normalize_stop_name(name: &str) -> Result<(String, String), ValidationIssue> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationIssue::InvalidStopName {
            reason: "name must not be blank".to_string(),
        });
    }
    if trimmed.chars().count() > STOP_NAME_MAX_CHARS {
        return Err(ValidationIssue::InvalidStopName {
            reason: format!("name must be at most {STOP_NAME_MAX_CHARS} characters"),
        });
    }

    let slug = slugify(trimmed);
    if slug.is_empty() {
        return Err(ValidationIssue::InvalidStopName {
            reason: "name must contain at least one letter or digit".to_string(),
        });
    }
    Ok((trimmed.to_string(), slug))
}
