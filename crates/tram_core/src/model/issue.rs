//! Structured validation issues.
//!
//! # Responsibility
//! - Describe every client-input problem as a typed value.
//! - Aggregate all issues of one request into a single `ValidationFailure`.
//!
//! # Invariants
//! - A `ValidationFailure` is never empty.
//! - Issues keep the order in which they were detected.

use crate::model::route::RouteNumber;
use crate::model::stop::{ConnectionId, StopId};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One reason a create/update request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// Another route already uses this number.
    DuplicateRouteNumber { number: RouteNumber },
    /// Route has fewer than two stops.
    TooFewStops { count: usize },
    /// Stop id does not resolve to an existing stop.
    UnknownStop { stop: StopId },
    /// Consecutive stops have no connection in either direction.
    /// `position` is the 1-based position of `from` in the request.
    StopsNotConnected {
        from: StopId,
        to: StopId,
        position: usize,
    },
    /// Payload carries a key that is not allowed at `path`.
    UnexpectedField { path: String },
    /// Required payload key is absent.
    MissingField { path: String },
    /// Payload value at `path` has the wrong JSON type.
    MalformedField { path: String, expected: &'static str },
    /// Another stop already has this exact name.
    DuplicateStopName { name: String },
    /// Another stop already canonicalizes to this slug.
    SlugCollision { slug: String, existing: StopId },
    /// Stop name is blank, too long or has no letters/digits.
    InvalidStopName { reason: String },
    /// Connection traversal time must be a positive number of minutes.
    InvalidTravelTime { minutes: i64 },
    /// Connection would link a stop to itself.
    SelfConnection { stop: StopId },
    /// The two stops are already connected.
    DuplicateConnection {
        stop_a: StopId,
        stop_b: StopId,
        existing: ConnectionId,
    },
}

impl Display for ValidationIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateRouteNumber { number } => {
                write!(f, "route number {number} is already in use")
            }
            Self::TooFewStops { count } => {
                write!(f, "route needs at least 2 stops, got {count}")
            }
            Self::UnknownStop { stop } => write!(f, "stop {stop} does not exist"),
            Self::StopsNotConnected { from, to, position } => write!(
                f,
                "stops {from} and {to} (positions {position} and {}) are not connected",
                position + 1
            ),
            Self::UnexpectedField { path } => write!(f, "unexpected field `{path}`"),
            Self::MissingField { path } => write!(f, "missing field `{path}`"),
            Self::MalformedField { path, expected } => {
                write!(f, "field `{path}` must be {expected}")
            }
            Self::DuplicateStopName { name } => write!(f, "stop name `{name}` is already in use"),
            Self::SlugCollision { slug, existing } => {
                write!(f, "slug `{slug}` already belongs to stop {existing}")
            }
            Self::InvalidStopName { reason } => write!(f, "invalid stop name: {reason}"),
            Self::InvalidTravelTime { minutes } => {
                write!(f, "travel time must be positive, got {minutes}")
            }
            Self::SelfConnection { stop } => write!(f, "stop {stop} cannot connect to itself"),
            Self::DuplicateConnection {
                stop_a,
                stop_b,
                existing,
            } => write!(
                f,
                "stops {stop_a} and {stop_b} are already connected by connection {existing}"
            ),
        }
    }
}

/// Complete set of issues found for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    issues: Vec<ValidationIssue>,
}

impl ValidationFailure {
    /// Returns `Ok(())` for an empty issue list, the failure otherwise.
    pub fn check(issues: Vec<ValidationIssue>) -> Result<(), Self> {
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Self { issues })
        }
    }

    pub fn single(issue: ValidationIssue) -> Self {
        Self {
            issues: vec![issue],
        }
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }

    pub fn contains(&self, issue: &ValidationIssue) -> bool {
        self.issues.contains(issue)
    }
}

impl Display for ValidationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation failed: ")?;
        for (index, issue) in self.issues.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl Error for ValidationFailure {}

#[cfg(test)]
mod tests {
    use super::{ValidationFailure, ValidationIssue};

    #[test]
    fn check_accepts_empty_list() {
        assert!(ValidationFailure::check(Vec::new()).is_ok());
    }

    #[test]
    fn failure_display_lists_every_issue() {
        let failure = ValidationFailure::check(vec![
            ValidationIssue::TooFewStops { count: 1 },
            ValidationIssue::UnknownStop { stop: 42 },
        ])
        .unwrap_err();
        let text = failure.to_string();
        assert!(text.contains("at least 2 stops"));
        assert!(text.contains("stop 42 does not exist"));
        assert_eq!(failure.issues().len(), 2);
    }

    #[test]
    fn issues_serialize_with_code_tag() {
        let value = serde_json::to_value(ValidationIssue::StopsNotConnected {
            from: 1,
            to: 3,
            position: 1,
        })
        .unwrap();
        assert_eq!(value["code"], "stops_not_connected");
        assert_eq!(value["from"], 1);
        assert_eq!(value["to"], 3);
    }
}
