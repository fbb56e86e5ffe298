//! Plain data records for the transit registry.
//!
//! # Responsibility
//! - Define the records exchanged between repositories, services and callers.
//! - Own the pure derivations: stop slugs and route display names.
//! - Describe structured validation issues and inbound payload parsing.
//!
//! # Invariants
//! - Records carry ids, never live handles; cross-entity reads are explicit
//!   repository queries.
//! - A stop slug is always `slugify(name)`.

pub mod issue;
pub mod payload;
pub mod route;
pub mod stop;
