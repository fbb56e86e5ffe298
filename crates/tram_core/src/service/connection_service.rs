//! Connection graph use-case service.
//!
//! # Responsibility
//! - Validate and create undirected stop connections.
//! - Expose adjacency and neighbor reads.
//!
//! # Invariants
//! - Both endpoints must exist when an edge is created.
//! - Self-referential edges and a second edge between the same unordered pair
//!   are rejected.
//! - Traversal time is a positive number of minutes.
//! - Deleting an edge never touches routes already assembled over it.

use crate::model::issue::{ValidationFailure, ValidationIssue};
use crate::model::stop::{
    ConnectionId, Neighbor, StopConnection, StopId, DEFAULT_TRAVEL_TIME_MINUTES,
};
use crate::repo::connection_repo::ConnectionGraph;
use crate::repo::stop_repo::StopStore;
use crate::repo::EntityRef;
use crate::service::error::{RegistryError, RegistryResult};
use log::info;

/// Use-case service for the connection graph.
pub struct ConnectionService<G: ConnectionGraph, S: StopStore> {
    graph: G,
    stops: S,
    default_travel_time: u32,
}

impl<G: ConnectionGraph, S: StopStore> ConnectionService<G, S> {
    pub fn new(graph: G, stops: S) -> Self {
        Self {
            graph,
            stops,
            default_travel_time: DEFAULT_TRAVEL_TIME_MINUTES,
        }
    }

    /// Overrides the traversal time used when `connect` gets none.
    ///
    /// A zero value keeps the built-in default.
    pub fn with_default_travel_time(mut self, minutes: u32) -> Self {
        if minutes > 0 {
            self.default_travel_time = minutes;
        }
        self
    }

    /// Creates an undirected connection between two stops.
    ///
    /// # Errors
    /// - `Invalid` with `UnknownStop`, `SelfConnection`, `InvalidTravelTime`
    ///   and/or `DuplicateConnection` issues, all reported together.
    pub fn connect(
        &self,
        stop_a: StopId,
        stop_b: StopId,
        travel_time_minutes: Option<i64>,
    ) -> RegistryResult<StopConnection> {
        let mut issues = Vec::new();

        let missing = self.stops.missing_stops(&[stop_a, stop_b])?;
        issues.extend(
            missing
                .iter()
                .map(|&stop| ValidationIssue::UnknownStop { stop }),
        );

        if stop_a == stop_b {
            issues.push(ValidationIssue::SelfConnection { stop: stop_a });
        }

        let requested = travel_time_minutes.unwrap_or(i64::from(self.default_travel_time));
        let minutes = u32::try_from(requested).ok().filter(|value| *value > 0);
        if minutes.is_none() {
            issues.push(ValidationIssue::InvalidTravelTime { minutes: requested });
        }

        if missing.is_empty() && stop_a != stop_b {
            if let Some(existing) = self.graph.find_connection(stop_a, stop_b)? {
                issues.push(ValidationIssue::DuplicateConnection {
                    stop_a,
                    stop_b,
                    existing: existing.id,
                });
            }
        }

        ValidationFailure::check(issues)?;
        let minutes = minutes.unwrap_or(self.default_travel_time);
        let connection = self.graph.insert_connection(stop_a, stop_b, minutes)?;
        info!(
            "event=connection_create module=connection_service status=ok connection_id={} stop_a={} stop_b={} minutes={}",
            connection.id, stop_a, stop_b, minutes
        );
        Ok(connection)
    }

    /// True iff the two stops share an edge in either direction.
    pub fn are_adjacent(&self, first: StopId, second: StopId) -> RegistryResult<bool> {
        self.graph.are_adjacent(first, second).map_err(Into::into)
    }

    pub fn get_connection(&self, id: ConnectionId) -> RegistryResult<StopConnection> {
        self.graph
            .get_connection(id)?
            .ok_or(RegistryError::NotFound(EntityRef::Connection(id)))
    }

    pub fn list_connections(&self) -> RegistryResult<Vec<StopConnection>> {
        self.graph.list_connections().map_err(Into::into)
    }

    /// Stops one hop away from `stop`.
    pub fn neighbors(&self, stop: StopId) -> RegistryResult<Vec<Neighbor>> {
        if self.stops.get_stop(stop)?.is_none() {
            return Err(RegistryError::NotFound(EntityRef::Stop(stop)));
        }
        self.graph.neighbors(stop).map_err(Into::into)
    }

    /// Deletes one connection.
    pub fn disconnect(&self, id: ConnectionId) -> RegistryResult<()> {
        self.graph.delete_connection(id)?;
        info!("event=connection_delete module=connection_service status=ok connection_id={id}");
        Ok(())
    }
}
