//! Route catalog contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist routes and their ordered stop membership (`route_stops`).
//! - Serve list/detail reads with display names derived from membership.
//!
//! # Invariants
//! - Membership is always written as a whole, positions `1..=N` in caller
//!   order; there is no partial patch.
//! - Write primitives (`insert_route`, `renumber_route`,
//!   `replace_route_stops`) do not open transactions; the assembler runs them
//!   inside its own.
//! - Route lists are ordered by route id (insertion order).

use crate::model::route::{Route, RouteDetail, RouteId, RouteNumber, RouteSummary};
use crate::model::stop::{Stop, StopId};
use crate::repo::stop_repo::parse_stop_row;
use crate::repo::{ensure_connection_ready, EntityRef, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for route persistence and reads.
pub trait RouteCatalog {
    fn find_route(&self, number: RouteNumber) -> RepoResult<Option<Route>>;
    /// Returns whether `number` belongs to a route other than `except`.
    fn number_in_use(&self, number: RouteNumber, except: Option<RouteId>) -> RepoResult<bool>;
    fn insert_route(&self, number: RouteNumber) -> RepoResult<Route>;
    fn renumber_route(&self, id: RouteId, number: RouteNumber) -> RepoResult<()>;
    /// Discards prior membership and writes `stops` at positions `1..=N`.
    fn replace_route_stops(&self, id: RouteId, stops: &[StopId]) -> RepoResult<()>;
    fn list_routes(&self) -> RepoResult<Vec<RouteSummary>>;
    fn get_route(&self, number: RouteNumber) -> RepoResult<Option<RouteDetail>>;
    /// Distinct routes that contain `stop`, ordered by route id.
    fn routes_through_stop(&self, stop: StopId) -> RepoResult<Vec<RouteSummary>>;
    /// Deletes one route; membership rows cascade.
    fn delete_route(&self, number: RouteNumber) -> RepoResult<()>;
}

/// SQLite-backed route catalog.
pub struct SqliteRouteCatalog<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRouteCatalog<'conn> {
    /// Creates the catalog from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["routes", "route_stops", "stops"])?;
        Ok(Self { conn })
    }

    pub(crate) fn attach(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn summarize(&self, route: Route) -> RepoResult<RouteSummary> {
        let stops = load_route_stops(self.conn, route.id)?;
        Ok(RouteDetail::new(route, stops).summary())
    }

    fn query_routes(&self, sql: &str, param: Option<StopId>) -> RepoResult<Vec<Route>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match param {
            Some(value) => stmt.query([value])?,
            None => stmt.query([])?,
        };
        let mut routes = Vec::new();
        while let Some(row) = rows.next()? {
            routes.push(Route {
                id: row.get("id")?,
                number: row.get("number")?,
            });
        }
        Ok(routes)
    }
}

impl RouteCatalog for SqliteRouteCatalog<'_> {
    fn find_route(&self, number: RouteNumber) -> RepoResult<Option<Route>> {
        self.conn
            .query_row(
                "SELECT id, number FROM routes WHERE number = ?1;",
                [number],
                |row| {
                    Ok(Route {
                        id: row.get("id")?,
                        number: row.get("number")?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    fn number_in_use(&self, number: RouteNumber, except: Option<RouteId>) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM routes
                WHERE number = ?1
                  AND (?2 IS NULL OR id <> ?2)
            );",
            params![number, except],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn insert_route(&self, number: RouteNumber) -> RepoResult<Route> {
        self.conn
            .execute("INSERT INTO routes (number) VALUES (?1);", [number])?;
        Ok(Route {
            id: self.conn.last_insert_rowid(),
            number,
        })
    }

    fn renumber_route(&self, id: RouteId, number: RouteNumber) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE routes SET number = ?2 WHERE id = ?1;",
            params![id, number],
        )?;
        if changed == 0 {
            return Err(RepoError::InvalidData(format!(
                "route id {id} vanished during renumber"
            )));
        }
        Ok(())
    }

    fn replace_route_stops(&self, id: RouteId, stops: &[StopId]) -> RepoResult<()> {
        write_route_stops(self.conn, id, stops)
    }

    fn list_routes(&self) -> RepoResult<Vec<RouteSummary>> {
        self.query_routes("SELECT id, number FROM routes ORDER BY id ASC;", None)?
            .into_iter()
            .map(|route| self.summarize(route))
            .collect()
    }

    fn get_route(&self, number: RouteNumber) -> RepoResult<Option<RouteDetail>> {
        let Some(route) = self.find_route(number)? else {
            return Ok(None);
        };
        let stops = load_route_stops(self.conn, route.id)?;
        Ok(Some(RouteDetail::new(route, stops)))
    }

    fn routes_through_stop(&self, stop: StopId) -> RepoResult<Vec<RouteSummary>> {
        self.query_routes(
            "SELECT r.id AS id, r.number AS number
             FROM routes r
             WHERE EXISTS (
                SELECT 1 FROM route_stops rs
                WHERE rs.route_id = r.id AND rs.stop_id = ?1
             )
             ORDER BY r.id ASC;",
            Some(stop),
        )?
        .into_iter()
        .map(|route| self.summarize(route))
        .collect()
    }

    fn delete_route(&self, number: RouteNumber) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM routes WHERE number = ?1;", [number])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Route(number)));
        }
        Ok(())
    }
}

/// Rewrites a route's full membership with dense positions.
pub(crate) fn write_route_stops(
    conn: &Connection,
    route_id: RouteId,
    stops: &[StopId],
) -> RepoResult<()> {
    conn.execute("DELETE FROM route_stops WHERE route_id = ?1;", [route_id])?;
    let mut stmt = conn.prepare(
        "INSERT INTO route_stops (route_id, stop_id, position) VALUES (?1, ?2, ?3);",
    )?;
    for (index, stop_id) in stops.iter().enumerate() {
        stmt.execute(params![route_id, stop_id, index as i64 + 1])?;
    }
    Ok(())
}

pub(crate) fn load_route_stop_ids(conn: &Connection, route_id: RouteId) -> RepoResult<Vec<StopId>> {
    let mut stmt = conn.prepare(
        "SELECT stop_id
         FROM route_stops
         WHERE route_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([route_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

fn load_route_stops(conn: &Connection, route_id: RouteId) -> RepoResult<Vec<Stop>> {
    let mut stmt = conn.prepare(
        "SELECT s.id AS id, s.name AS name, s.slug AS slug
         FROM route_stops rs
         INNER JOIN stops s ON s.id = rs.stop_id
         WHERE rs.route_id = ?1
         ORDER BY rs.position ASC;",
    )?;
    let mut rows = stmt.query([route_id])?;
    let mut stops = Vec::new();
    while let Some(row) = rows.next()? {
        stops.push(parse_stop_row(row)?);
    }
    Ok(stops)
}
