//! Core domain logic for the tram network registry.
//! This crate is the single source of truth for stop, connection and route
//! invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, RegistryConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::issue::{ValidationFailure, ValidationIssue};
pub use model::route::{RouteDetail, RouteDraft, RouteNumber, RouteSummary};
pub use model::stop::{Neighbor, Stop, StopConnection, StopDetail, StopId};
pub use repo::{EntityRef, RepoError, RepoResult};
pub use service::error::{RegistryError, RegistryResult};
pub use service::route_assembler::RouteAssembler;
pub use service::route_service::RouteService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
