//! Registry use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Map repository failures onto the `RegistryError` taxonomy.
//! - Keep callers (CLI, future transports) decoupled from storage details.

pub mod connection_service;
pub mod error;
pub mod route_assembler;
pub mod route_service;
pub mod stop_service;
