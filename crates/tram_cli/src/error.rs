//! CLI error envelope.

use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use tram_core::{ConfigError, DbError, LoggingError, RegistryError, RepoError};

#[derive(Debug)]
pub enum CliError {
    Config(ConfigError),
    Logging(LoggingError),
    Db(DbError),
    Registry(RegistryError),
    Json(serde_json::Error),
    Io(std::io::Error),
    Usage(&'static str),
}

impl CliError {
    /// Machine-readable failure body; validation failures carry every issue.
    pub fn to_json(&self) -> Value {
        let kind = match self {
            Self::Config(_) => "config",
            Self::Logging(_) => "logging",
            Self::Db(_) => "database",
            Self::Registry(RegistryError::NotFound(_)) => "not_found",
            Self::Registry(RegistryError::Invalid(_)) => "invalid",
            Self::Registry(RegistryError::Conflict(_)) => "conflict",
            Self::Registry(RegistryError::Repo(_)) => "internal",
            Self::Json(_) => "json",
            Self::Io(_) => "io",
            Self::Usage(_) => "usage",
        };
        let mut body = json!({ "error": kind, "message": self.to_string() });
        if let Self::Registry(RegistryError::Invalid(failure)) = self {
            body["issues"] = json!(failure.issues());
        }
        body
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Registry(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "invalid json: {err}"),
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Usage(message) => write!(f, "{message}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Registry(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Usage(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RegistryError> for CliError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Registry(value.into())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
