//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the explicit data-access contracts: `StopStore`,
//!   `ConnectionGraph` and `RouteCatalog`.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories take and return plain records; every join is an explicit
//!   query.
//! - Storage uniqueness violations surface as `RepoError::UniqueViolation`,
//!   never as generic database errors.
//! - Repositories only attach to connections migrated to the latest schema.

pub mod connection_repo;
pub mod route_repo;
pub mod stop_repo;

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::route::RouteNumber;
use crate::model::stop::{ConnectionId, StopId};
use rusqlite::{ffi, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Entity addressed by a failed lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Stop(StopId),
    StopSlug(String),
    Route(RouteNumber),
    Connection(ConnectionId),
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stop(id) => write!(f, "stop {id}"),
            Self::StopSlug(slug) => write!(f, "stop `{slug}`"),
            Self::Route(number) => write!(f, "route {number}"),
            Self::Connection(id) => write!(f, "connection {id}"),
        }
    }
}

/// Repository error for registry persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(EntityRef),
    /// A storage-level unique constraint rejected the write.
    UniqueViolation(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::UniqueViolation(message) => write!(f, "unique constraint violated: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "registry repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "registry repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted registry data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        let unique = matches!(
            &value,
            rusqlite::Error::SqliteFailure(err, _)
                if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        );
        if unique {
            Self::UniqueViolation(value.to_string())
        } else {
            Self::Db(DbError::Sqlite(value))
        }
    }
}

/// Checks that `conn` is migrated and carries every table in `tables`.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

/// Converts a stored travel time into the record type.
pub(crate) fn travel_time_from_db(value: i64) -> RepoResult<u32> {
    u32::try_from(value)
        .ok()
        .filter(|minutes| *minutes > 0)
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid travel time `{value}` in stop_connections.travel_time_minutes"
            ))
        })
}
