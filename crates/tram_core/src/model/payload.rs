//! Inbound route payload parsing.
//!
//! Accepted shape: `{"number": <integer>, "stops": [{"id": <integer>}, ...]}`.
//! Stop entries may only carry `id`. Other top-level keys (`id`, `name`
//! echoed back from a route read) are ignored.
//!
//! Parsing is lenient: every shape problem is recorded as an issue, and a
//! draft is still produced whenever the number and every stop id could be
//! read, so semantic checks can run and report alongside shape issues.

use crate::model::issue::ValidationIssue;
use crate::model::route::RouteDraft;
use serde_json::{Map, Value};

const NUMBER_KEY: &str = "number";
const STOPS_KEY: &str = "stops";
const STOP_ID_KEY: &str = "id";

/// Result of parsing one route payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRoutePayload {
    /// `None` when the number or any stop id is unreadable.
    pub draft: Option<RouteDraft>,
    pub issues: Vec<ValidationIssue>,
}

/// Parses a create/update route payload.
pub fn parse_route_payload(value: &Value) -> ParsedRoutePayload {
    let mut issues = Vec::new();
    let Some(object) = value.as_object() else {
        issues.push(ValidationIssue::MalformedField {
            path: "$".to_string(),
            expected: "an object",
        });
        return ParsedRoutePayload {
            draft: None,
            issues,
        };
    };

    let number = read_integer(object, NUMBER_KEY, NUMBER_KEY.to_string(), &mut issues);
    let stops = match object.get(STOPS_KEY) {
        None => {
            issues.push(ValidationIssue::MissingField {
                path: STOPS_KEY.to_string(),
            });
            None
        }
        // Collect before folding into `Option` so every entry reports its issues.
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| read_stop_entry(index, entry, &mut issues))
            .collect::<Vec<_>>()
            .into_iter()
            .collect::<Option<Vec<_>>>(),
        Some(_) => {
            issues.push(ValidationIssue::MalformedField {
                path: STOPS_KEY.to_string(),
                expected: "an array",
            });
            None
        }
    };

    let draft = match (number, stops) {
        (Some(number), Some(stops)) => Some(RouteDraft { number, stops }),
        _ => None,
    };
    ParsedRoutePayload { draft, issues }
}

fn read_stop_entry(index: usize, entry: &Value, issues: &mut Vec<ValidationIssue>) -> Option<i64> {
    let path = format!("{STOPS_KEY}[{index}]");
    let Some(object) = entry.as_object() else {
        issues.push(ValidationIssue::MalformedField {
            path,
            expected: "an object",
        });
        return None;
    };

    for key in object.keys() {
        if key != STOP_ID_KEY {
            issues.push(ValidationIssue::UnexpectedField {
                path: format!("{path}.{key}"),
            });
        }
    }

    read_integer(object, STOP_ID_KEY, format!("{path}.{STOP_ID_KEY}"), issues)
}

fn read_integer(
    object: &Map<String, Value>,
    key: &str,
    path: String,
    issues: &mut Vec<ValidationIssue>,
) -> Option<i64> {
    match object.get(key) {
        None => {
            issues.push(ValidationIssue::MissingField { path });
            None
        }
        Some(value) => match value.as_i64() {
            Some(number) => Some(number),
            None => {
                issues.push(ValidationIssue::MalformedField {
                    path,
                    expected: "an integer",
                });
                None
            }
        },
    }
}
