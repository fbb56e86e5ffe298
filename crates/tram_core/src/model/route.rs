//! Route records and display name derivation.
//!
//! # Invariants
//! - Route membership positions are dense `1..=N` in caller order.
//! - The display name is derived from the current membership on every read.

use crate::model::stop::{Stop, StopId};
use serde::Serialize;

/// Store-assigned route identifier.
pub type RouteId = i64;

/// Public, globally unique route number used for lookups.
pub type RouteNumber = i64;

/// Routes need at least this many stops.
pub const MIN_ROUTE_STOPS: usize = 2;

/// Persisted route identity without membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub id: RouteId,
    pub number: RouteNumber,
}

/// Candidate route: a number plus an ordered list of stop ids.
///
/// Drafts are unvalidated; only the assembler turns them into routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDraft {
    pub number: RouteNumber,
    pub stops: Vec<StopId>,
}

impl RouteDraft {
    pub fn new(number: RouteNumber, stops: impl Into<Vec<StopId>>) -> Self {
        Self {
            number,
            stops: stops.into(),
        }
    }

    /// Consecutive `(from, to)` pairs in caller order.
    pub fn hops(&self) -> impl Iterator<Item = (StopId, StopId)> + '_ {
        self.stops.windows(2).map(|pair| (pair[0], pair[1]))
    }
}

/// List read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub id: RouteId,
    pub number: RouteNumber,
    pub name: String,
}

/// Detail read model; `stops` is ordered by membership position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDetail {
    pub id: RouteId,
    pub number: RouteNumber,
    pub name: String,
    pub stops: Vec<Stop>,
}

impl RouteDetail {
    pub fn new(route: Route, stops: Vec<Stop>) -> Self {
        Self {
            id: route.id,
            number: route.number,
            name: route_display_name(route.number, &stops),
            stops,
        }
    }

    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            id: self.id,
            number: self.number,
            name: self.name.clone(),
        }
    }

    pub fn stop_ids(&self) -> Vec<StopId> {
        self.stops.iter().map(|stop| stop.id).collect()
    }
}

/// Returns `"{first} - {last}"` for routes with two or more stops, else the
/// bare route number.
pub fn route_display_name(number: RouteNumber, ordered_stops: &[Stop]) -> String {
    match ordered_stops {
        [first, .., last] => format!("{} - {}", first.name, last.name),
        _ => number.to_string(),
    }
}
