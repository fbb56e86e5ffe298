//! Route assembly: validation plus atomic membership write.
//!
//! # Responsibility
//! - Decide whether a number + ordered stop list forms a legal route.
//! - Create a route, or fully replace an existing route's number and
//!   membership, all-or-nothing.
//!
//! # Invariants
//! - Every check runs before any write, and every applicable issue is
//!   reported in one `ValidationFailure`.
//! - Adjacency is checked hop by hop in caller order; stops are never
//!   reordered and no path is searched.
//! - Checks and writes share one `BEGIN IMMEDIATE` transaction, so two
//!   assemblies racing on the same number serialize; the loser sees a
//!   duplicate-number issue, or `Conflict` if the storage constraint fires.
//! - Any failure drops the transaction, which rolls back every write made
//!   during the call, including a freshly inserted route.

use crate::model::issue::{ValidationFailure, ValidationIssue};
use crate::model::payload::parse_route_payload;
use crate::model::route::{Route, RouteDetail, RouteDraft, RouteNumber, MIN_ROUTE_STOPS};
use crate::repo::connection_repo::{ConnectionGraph, SqliteConnectionGraph};
use crate::repo::route_repo::{RouteCatalog, SqliteRouteCatalog};
use crate::repo::stop_repo::{SqliteStopStore, StopStore};
use crate::repo::{ensure_connection_ready, EntityRef, RepoError, RepoResult};
use crate::service::error::{RegistryError, RegistryResult};
use log::{error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde_json::Value;
use std::time::Instant;

/// Validates and materializes routes on one SQLite connection.
pub struct RouteAssembler<'conn> {
    conn: &'conn Connection,
}

impl<'conn> RouteAssembler<'conn> {
    /// Creates the assembler from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RegistryResult<Self> {
        ensure_connection_ready(conn, &["stops", "stop_connections", "routes", "route_stops"])?;
        Ok(Self { conn })
    }

    /// Creates (`existing = None`) or fully replaces (`existing = Some(n)`,
    /// the route currently numbered `n`) a route from `draft`.
    ///
    /// # Errors
    /// - `NotFound` when `existing` names no route.
    /// - `Invalid` with every issue found; nothing is written.
    /// - `Conflict` when a storage unique constraint rejects the write.
    pub fn assemble(
        &self,
        draft: &RouteDraft,
        existing: Option<RouteNumber>,
    ) -> RegistryResult<RouteDetail> {
        self.assemble_with_issues(draft, existing, Vec::new())
    }

    /// Same as [`assemble`](Self::assemble) for a raw
    /// `{"number", "stops": [{"id"}]}` payload; payload shape issues are
    /// reported together with the semantic ones.
    pub fn assemble_payload(
        &self,
        payload: &Value,
        existing: Option<RouteNumber>,
    ) -> RegistryResult<RouteDetail> {
        let parsed = parse_route_payload(payload);
        match parsed.draft {
            Some(draft) => self.assemble_with_issues(&draft, existing, parsed.issues),
            None => {
                if let Some(number) = existing {
                    SqliteRouteCatalog::attach(self.conn)
                        .find_route(number)?
                        .ok_or(RegistryError::NotFound(EntityRef::Route(number)))?;
                }
                log_rejected(mode_label(existing), None, parsed.issues.len());
                ValidationFailure::check(parsed.issues)?;
                Err(RepoError::InvalidData(
                    "route payload produced neither a draft nor issues".to_string(),
                )
                .into())
            }
        }
    }

    fn assemble_with_issues(
        &self,
        draft: &RouteDraft,
        existing: Option<RouteNumber>,
        mut issues: Vec<ValidationIssue>,
    ) -> RegistryResult<RouteDetail> {
        let started_at = Instant::now();
        let mode = mode_label(existing);
        info!(
            "event=route_assemble module=assembler status=start mode={} number={} stops={}",
            mode,
            draft.number,
            draft.stops.len()
        );

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let stops = SqliteStopStore::attach(&tx);
        let graph = SqliteConnectionGraph::attach(&tx);
        let routes = SqliteRouteCatalog::attach(&tx);

        let target = match existing {
            Some(number) => Some(
                routes
                    .find_route(number)?
                    .ok_or(RegistryError::NotFound(EntityRef::Route(number)))?,
            ),
            None => None,
        };

        issues.extend(collect_issues(draft, target.as_ref(), &stops, &graph, &routes)?);
        if let Err(failure) = ValidationFailure::check(issues) {
            log_rejected(mode, Some(draft.number), failure.issues().len());
            return Err(failure.into());
        }

        match write_assembly(&routes, draft, target) {
            Ok(detail) => {
                tx.commit()?;
                info!(
                    "event=route_assemble module=assembler status=ok mode={} number={} route_id={} stops={} duration_ms={}",
                    mode,
                    detail.number,
                    detail.id,
                    detail.stops.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(detail)
            }
            Err(err) => {
                error!(
                    "event=route_assemble module=assembler status=error mode={} number={} duration_ms={} error={}",
                    mode,
                    draft.number,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }
}

/// Runs every route check against the given repositories.
///
/// Checks, in order: number uniqueness (ignoring `target` itself), minimum
/// length, stop existence (each unknown id once), and adjacency of every
/// consecutive pair whose stops both exist.
pub fn collect_issues<S, G, R>(
    draft: &RouteDraft,
    target: Option<&Route>,
    stops: &S,
    graph: &G,
    routes: &R,
) -> RepoResult<Vec<ValidationIssue>>
where
    S: StopStore + ?Sized,
    G: ConnectionGraph + ?Sized,
    R: RouteCatalog + ?Sized,
{
    let mut issues = Vec::new();

    if routes.number_in_use(draft.number, target.map(|route| route.id))? {
        issues.push(ValidationIssue::DuplicateRouteNumber {
            number: draft.number,
        });
    }

    if draft.stops.len() < MIN_ROUTE_STOPS {
        issues.push(ValidationIssue::TooFewStops {
            count: draft.stops.len(),
        });
    }

    let missing = stops.missing_stops(&draft.stops)?;
    issues.extend(
        missing
            .iter()
            .map(|&stop| ValidationIssue::UnknownStop { stop }),
    );

    for (index, (from, to)) in draft.hops().enumerate() {
        if missing.contains(&from) || missing.contains(&to) {
            continue;
        }
        if !graph.are_adjacent(from, to)? {
            issues.push(ValidationIssue::StopsNotConnected {
                from,
                to,
                position: index + 1,
            });
        }
    }

    Ok(issues)
}

fn write_assembly<R: RouteCatalog + ?Sized>(
    routes: &R,
    draft: &RouteDraft,
    target: Option<Route>,
) -> RepoResult<RouteDetail> {
    let route = match target {
        None => routes.insert_route(draft.number)?,
        Some(route) => {
            if route.number != draft.number {
                routes.renumber_route(route.id, draft.number)?;
            }
            Route {
                id: route.id,
                number: draft.number,
            }
        }
    };
    routes.replace_route_stops(route.id, &draft.stops)?;

    let detail = routes.get_route(route.number)?.ok_or_else(|| {
        RepoError::InvalidData(format!("route {} missing after assembly", route.number))
    })?;
    if detail.stop_ids() != draft.stops {
        return Err(RepoError::InvalidData(format!(
            "route {} membership differs from assembled order",
            route.number
        )));
    }
    Ok(detail)
}

fn mode_label(existing: Option<RouteNumber>) -> &'static str {
    if existing.is_some() {
        "update"
    } else {
        "create"
    }
}

fn log_rejected(mode: &str, number: Option<RouteNumber>, issue_count: usize) {
    match number {
        Some(number) => info!(
            "event=route_assemble module=assembler status=rejected mode={mode} number={number} issues={issue_count}"
        ),
        None => info!(
            "event=route_assemble module=assembler status=rejected mode={mode} issues={issue_count}"
        ),
    }
}
