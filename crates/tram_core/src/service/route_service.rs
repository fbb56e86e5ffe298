//! Route catalog use-case service.
//!
//! # Responsibility
//! - Route create/update entry points, delegated to `RouteAssembler`.
//! - Route list/detail/delete reads and the stop detail read.
//!
//! # Invariants
//! - Route names are recomputed from membership on every read.
//! - Mutations never bypass the assembler.

use crate::model::route::{RouteDetail, RouteDraft, RouteNumber, RouteSummary};
use crate::model::stop::StopDetail;
use crate::repo::route_repo::{RouteCatalog, SqliteRouteCatalog};
use crate::repo::stop_repo::{SqliteStopStore, StopStore};
use crate::repo::EntityRef;
use crate::service::error::{RegistryError, RegistryResult};
use crate::service::route_assembler::RouteAssembler;
use log::info;
use rusqlite::Connection;
use serde_json::Value;

/// Route use-case facade over one SQLite connection.
pub struct RouteService<'conn> {
    assembler: RouteAssembler<'conn>,
    catalog: SqliteRouteCatalog<'conn>,
    stops: SqliteStopStore<'conn>,
}

impl<'conn> RouteService<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RegistryResult<Self> {
        Ok(Self {
            assembler: RouteAssembler::try_new(conn)?,
            catalog: SqliteRouteCatalog::try_new(conn)?,
            stops: SqliteStopStore::try_new(conn)?,
        })
    }

    /// Creates a new route.
    pub fn create_route(&self, draft: &RouteDraft) -> RegistryResult<RouteDetail> {
        self.assembler.assemble(draft, None)
    }

    /// Replaces number and full membership of the route numbered `number`.
    pub fn update_route(
        &self,
        number: RouteNumber,
        draft: &RouteDraft,
    ) -> RegistryResult<RouteDetail> {
        self.assembler.assemble(draft, Some(number))
    }

    /// Creates a route from a `{"number", "stops": [{"id"}]}` payload.
    pub fn create_route_from_json(&self, payload: &Value) -> RegistryResult<RouteDetail> {
        self.assembler.assemble_payload(payload, None)
    }

    /// Replaces the route numbered `number` from a raw payload.
    pub fn update_route_from_json(
        &self,
        number: RouteNumber,
        payload: &Value,
    ) -> RegistryResult<RouteDetail> {
        self.assembler.assemble_payload(payload, Some(number))
    }

    /// Lists route summaries in insertion order.
    pub fn list_routes(&self) -> RegistryResult<Vec<RouteSummary>> {
        self.catalog.list_routes().map_err(Into::into)
    }

    /// Loads one route with its ordered stops.
    pub fn get_route(&self, number: RouteNumber) -> RegistryResult<RouteDetail> {
        self.catalog
            .get_route(number)?
            .ok_or(RegistryError::NotFound(EntityRef::Route(number)))
    }

    /// Deletes one route and its membership.
    pub fn delete_route(&self, number: RouteNumber) -> RegistryResult<()> {
        self.catalog.delete_route(number)?;
        info!("event=route_delete module=route_service status=ok number={number}");
        Ok(())
    }

    /// Loads one stop by slug with every route passing through it.
    pub fn stop_detail(&self, slug: &str) -> RegistryResult<StopDetail> {
        let stop = self
            .stops
            .get_stop_by_slug(slug)?
            .ok_or_else(|| RegistryError::NotFound(EntityRef::StopSlug(slug.to_string())))?;
        let routes = self.catalog.routes_through_stop(stop.id)?;
        Ok(StopDetail::new(stop, routes))
    }
}
