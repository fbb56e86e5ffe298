//! Service-level error taxonomy.
//!
//! - `NotFound`: referenced stop/route/connection does not exist.
//! - `Invalid`: one or more client input problems, reported together.
//! - `Conflict`: a concurrent write beat an optimistic pre-check; retryable.
//! - `Repo`: unexpected persistence failure, raised after rollback.

use crate::model::issue::ValidationFailure;
use crate::repo::{EntityRef, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug)]
pub enum RegistryError {
    NotFound(EntityRef),
    Invalid(ValidationFailure),
    Conflict(String),
    Repo(RepoError),
}

impl RegistryError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn validation(&self) -> Option<&ValidationFailure> {
        match self {
            Self::Invalid(failure) => Some(failure),
            _ => None,
        }
    }
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::Invalid(failure) => write!(f, "{failure}"),
            Self::Conflict(message) => write!(f, "concurrent write conflict: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(failure) => Some(failure),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RegistryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(entity) => Self::NotFound(entity),
            RepoError::UniqueViolation(message) => Self::Conflict(message),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for RegistryError {
    fn from(value: rusqlite::Error) -> Self {
        RepoError::from(value).into()
    }
}

impl From<ValidationFailure> for RegistryError {
    fn from(value: ValidationFailure) -> Self {
        Self::Invalid(value)
    }
}
