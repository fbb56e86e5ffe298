//! Connection graph contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist undirected stop-to-stop edges with traversal times.
//! - Answer single-hop adjacency and neighbor queries.
//!
//! # Invariants
//! - Adjacency holds if an edge exists in either stored direction.
//! - No multi-hop reachability is computed here.

use crate::model::stop::{ConnectionId, Neighbor, Stop, StopConnection, StopId};
use crate::repo::{
    ensure_connection_ready, travel_time_from_db, EntityRef, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const CONNECTION_SELECT_SQL: &str =
    "SELECT id, stop_a_id, stop_b_id, travel_time_minutes FROM stop_connections";

/// Repository interface for the stop connection graph.
pub trait ConnectionGraph {
    fn insert_connection(
        &self,
        stop_a: StopId,
        stop_b: StopId,
        travel_time_minutes: u32,
    ) -> RepoResult<StopConnection>;
    fn get_connection(&self, id: ConnectionId) -> RepoResult<Option<StopConnection>>;
    /// Lists all edges ordered by id.
    fn list_connections(&self) -> RepoResult<Vec<StopConnection>>;
    /// Returns the lowest-id edge joining the two stops in either direction.
    fn find_connection(
        &self,
        first: StopId,
        second: StopId,
    ) -> RepoResult<Option<StopConnection>>;
    /// True iff an edge exists between the two stops in either direction.
    fn are_adjacent(&self, first: StopId, second: StopId) -> RepoResult<bool>;
    /// Stops one hop away from `stop`, ordered by connection id.
    fn neighbors(&self, stop: StopId) -> RepoResult<Vec<Neighbor>>;
    fn delete_connection(&self, id: ConnectionId) -> RepoResult<()>;
}

/// SQLite-backed connection graph.
pub struct SqliteConnectionGraph<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteConnectionGraph<'conn> {
    /// Creates the graph from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["stops", "stop_connections"])?;
        Ok(Self { conn })
    }

    pub(crate) fn attach(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ConnectionGraph for SqliteConnectionGraph<'_> {
    fn insert_connection(
        &self,
        stop_a: StopId,
        stop_b: StopId,
        travel_time_minutes: u32,
    ) -> RepoResult<StopConnection> {
        self.conn.execute(
            "INSERT INTO stop_connections (stop_a_id, stop_b_id, travel_time_minutes)
             VALUES (?1, ?2, ?3);",
            params![stop_a, stop_b, travel_time_minutes],
        )?;
        Ok(StopConnection {
            id: self.conn.last_insert_rowid(),
            stop_a,
            stop_b,
            travel_time_minutes,
        })
    }

    fn get_connection(&self, id: ConnectionId) -> RepoResult<Option<StopConnection>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CONNECTION_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_connection_row(row)?));
        }
        Ok(None)
    }

    fn list_connections(&self) -> RepoResult<Vec<StopConnection>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CONNECTION_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut connections = Vec::new();
        while let Some(row) = rows.next()? {
            connections.push(parse_connection_row(row)?);
        }
        Ok(connections)
    }

    fn find_connection(
        &self,
        first: StopId,
        second: StopId,
    ) -> RepoResult<Option<StopConnection>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONNECTION_SELECT_SQL}
             WHERE (stop_a_id = ?1 AND stop_b_id = ?2)
                OR (stop_a_id = ?2 AND stop_b_id = ?1)
             ORDER BY id ASC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query(params![first, second])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_connection_row(row)?));
        }
        Ok(None)
    }

    fn are_adjacent(&self, first: StopId, second: StopId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM stop_connections
                WHERE (stop_a_id = ?1 AND stop_b_id = ?2)
                   OR (stop_a_id = ?2 AND stop_b_id = ?1)
            );",
            params![first, second],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn neighbors(&self, stop: StopId) -> RepoResult<Vec<Neighbor>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                c.id AS connection_id,
                c.travel_time_minutes AS travel_time_minutes,
                s.id AS id,
                s.name AS name,
                s.slug AS slug
             FROM stop_connections c
             INNER JOIN stops s
                ON s.id = CASE WHEN c.stop_a_id = ?1 THEN c.stop_b_id ELSE c.stop_a_id END
             WHERE c.stop_a_id = ?1 OR c.stop_b_id = ?1
             ORDER BY c.id ASC;",
        )?;
        let mut rows = stmt.query([stop])?;
        let mut neighbors = Vec::new();
        while let Some(row) = rows.next()? {
            neighbors.push(Neighbor {
                connection_id: row.get("connection_id")?,
                travel_time_minutes: travel_time_from_db(row.get("travel_time_minutes")?)?,
                stop: Stop {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    slug: row.get("slug")?,
                },
            });
        }
        Ok(neighbors)
    }

    fn delete_connection(&self, id: ConnectionId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM stop_connections WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Connection(id)));
        }
        Ok(())
    }
}

fn parse_connection_row(row: &Row<'_>) -> RepoResult<StopConnection> {
    Ok(StopConnection {
        id: row.get("id")?,
        stop_a: row.get("stop_a_id")?,
        stop_b: row.get("stop_b_id")?,
        travel_time_minutes: travel_time_from_db(row.get("travel_time_minutes")?)?,
    })
}
