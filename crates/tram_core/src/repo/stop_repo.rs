//! Stop store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist stops (name + slug) and answer identity lookups.
//! - Cascade stop deletion into connections and route membership.
//!
//! # Invariants
//! - Callers pass an already canonical slug; the store never derives or
//!   disambiguates slugs itself.
//! - Deleting a stop keeps every affected route's positions dense `1..=N`.

use crate::model::route::RouteId;
use crate::model::stop::{Stop, StopId};
use crate::repo::route_repo::{load_route_stop_ids, write_route_stops};
use crate::repo::{ensure_connection_ready, EntityRef, RepoError, RepoResult};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashSet;

const STOP_SELECT_SQL: &str = "SELECT id, name, slug FROM stops";

/// Repository interface for stop persistence.
pub trait StopStore {
    /// Inserts one stop; unique name/slug violations surface as
    /// `RepoError::UniqueViolation`.
    fn insert_stop(&self, name: &str, slug: &str) -> RepoResult<Stop>;
    /// Replaces name and slug of an existing stop.
    fn update_stop(&self, id: StopId, name: &str, slug: &str) -> RepoResult<Stop>;
    fn get_stop(&self, id: StopId) -> RepoResult<Option<Stop>>;
    fn get_stop_by_slug(&self, slug: &str) -> RepoResult<Option<Stop>>;
    fn get_stop_by_name(&self, name: &str) -> RepoResult<Option<Stop>>;
    /// Lists all stops ordered by id.
    fn list_stops(&self) -> RepoResult<Vec<Stop>>;
    /// Returns the ids from `ids` that resolve to no stop, deduplicated and in
    /// first-seen order.
    fn missing_stops(&self, ids: &[StopId]) -> RepoResult<Vec<StopId>>;
    /// Deletes one stop with its connections and route memberships.
    fn delete_stop(&self, id: StopId) -> RepoResult<()>;
}

/// SQLite-backed stop store.
pub struct SqliteStopStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStopStore<'conn> {
    /// Creates the store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["stops", "stop_connections", "route_stops"])?;
        Ok(Self { conn })
    }

    /// Attaches to a connection (or open transaction) already checked by the
    /// caller.
    pub(crate) fn attach(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl StopStore for SqliteStopStore<'_> {
    fn insert_stop(&self, name: &str, slug: &str) -> RepoResult<Stop> {
        self.conn.execute(
            "INSERT INTO stops (name, slug) VALUES (?1, ?2);",
            params![name, slug],
        )?;
        Ok(Stop {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            slug: slug.to_string(),
        })
    }

    fn update_stop(&self, id: StopId, name: &str, slug: &str) -> RepoResult<Stop> {
        let changed = self.conn.execute(
            "UPDATE stops SET name = ?2, slug = ?3 WHERE id = ?1;",
            params![id, name, slug],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Stop(id)));
        }
        Ok(Stop {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
        })
    }

    fn get_stop(&self, id: StopId) -> RepoResult<Option<Stop>> {
        self.conn
            .query_row(
                &format!("{STOP_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_stop_row,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_stop_by_slug(&self, slug: &str) -> RepoResult<Option<Stop>> {
        self.conn
            .query_row(
                &format!("{STOP_SELECT_SQL} WHERE slug = ?1;"),
                [slug],
                parse_stop_row,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_stop_by_name(&self, name: &str) -> RepoResult<Option<Stop>> {
        self.conn
            .query_row(
                &format!("{STOP_SELECT_SQL} WHERE name = ?1;"),
                [name],
                parse_stop_row,
            )
            .optional()
            .map_err(Into::into)
    }

    fn list_stops(&self) -> RepoResult<Vec<Stop>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STOP_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut stops = Vec::new();
        while let Some(row) = rows.next()? {
            stops.push(parse_stop_row(row)?);
        }
        Ok(stops)
    }

    fn missing_stops(&self, ids: &[StopId]) -> RepoResult<Vec<StopId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT EXISTS(SELECT 1 FROM stops WHERE id = ?1);")?;
        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            let exists: i64 = stmt.query_row([id], |row| row.get(0))?;
            if exists == 0 {
                missing.push(id);
            }
        }
        Ok(missing)
    }

    fn delete_stop(&self, id: StopId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let affected_routes = list_routes_through_stop(&tx, id)?;

        let changed = tx.execute("DELETE FROM stops WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Stop(id)));
        }

        // Cascade removed the memberships; close the gaps they left.
        for route_id in &affected_routes {
            let remaining = load_route_stop_ids(&tx, *route_id)?;
            write_route_stops(&tx, *route_id, &remaining)?;
        }

        tx.commit()?;
        info!(
            "event=stop_delete module=repo status=ok stop_id={} routes_compacted={}",
            id,
            affected_routes.len()
        );
        Ok(())
    }
}

fn list_routes_through_stop(conn: &Connection, stop_id: StopId) -> RepoResult<Vec<RouteId>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT route_id
         FROM route_stops
         WHERE stop_id = ?1
         ORDER BY route_id ASC;",
    )?;
    let mut rows = stmt.query([stop_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

pub(crate) fn parse_stop_row(row: &Row<'_>) -> rusqlite::Result<Stop> {
    Ok(Stop {
        id: row.get("id")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
    })
}
