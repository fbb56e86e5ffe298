//! Registry configuration loaded from TOML.
//!
//! The config file is selected via:
//! 1. an explicit `--config <path>` argument
//! 2. the `TRAM_CONFIG` environment variable
//! 3. built-in defaults when neither is present

use crate::logging::LogLevel;
use crate::model::stop::DEFAULT_TRAVEL_TIME_MINUTES;
use serde::Deserialize;
use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "TRAM_CONFIG";
const DEFAULT_DATABASE_PATH: &str = "tram.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "LogLevel::build_default")]
    pub level: LogLevel,
    /// File logging is enabled only when a directory is configured.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::build_default(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    #[serde(default = "default_travel_time_minutes")]
    pub default_travel_time_minutes: i64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            default_travel_time_minutes: default_travel_time_minutes(),
        }
    }
}

fn default_travel_time_minutes() -> i64 {
    i64::from(DEFAULT_TRAVEL_TIME_MINUTES)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    InvalidValue { field: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::InvalidValue { field, message } => {
                write!(f, "invalid config value for `{field}`: {message}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::InvalidValue { .. } => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl RegistryConfig {
    /// Picks the config file path: explicit argument first, then `TRAM_CONFIG`.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        env::var_os(CONFIG_ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }

    /// Loads the resolved config file, or defaults when no path resolves.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        match Self::resolve_path(explicit) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        log::info!(
            "event=config_load module=config status=ok path={} database={}",
            path.display(),
            config.database.path.display()
        );
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.network.default_travel_time_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "network.default_travel_time_minutes",
                message: format!(
                    "must be a positive integer, got {}",
                    self.network.default_travel_time_minutes
                ),
            });
        }
        if u32::try_from(self.network.default_travel_time_minutes).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "network.default_travel_time_minutes",
                message: "value is too large".to_string(),
            });
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.path",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Validated default travel time for new connections.
    pub fn default_travel_time(&self) -> u32 {
        u32::try_from(self.network.default_travel_time_minutes)
            .unwrap_or(DEFAULT_TRAVEL_TIME_MINUTES)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, RegistryConfig};
    use crate::logging::LogLevel;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    #[test]
    fn empty_file_uses_defaults() {
        let config = RegistryConfig::from_toml_str("").unwrap();
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.database.path, PathBuf::from("tram.sqlite3"));
        assert_eq!(config.default_travel_time(), 2);
        assert!(config.logging.dir.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config = RegistryConfig::from_toml_str(
            r#"
            [database]
            path = "/var/lib/tram/registry.sqlite3"

            [logging]
            level = "warn"
            dir = "/var/log/tram"

            [network]
            default_travel_time_minutes = 5
            "#,
        )
        .unwrap();

        assert_eq!(
            config.database.path,
            PathBuf::from("/var/lib/tram/registry.sqlite3")
        );
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.logging.dir, Some(PathBuf::from("/var/log/tram")));
        assert_eq!(config.default_travel_time(), 5);
    }

    #[test]
    fn non_positive_travel_time_is_rejected() {
        let err = RegistryConfig::from_toml_str("[network]\ndefault_travel_time_minutes = 0")
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "network.default_travel_time_minutes",
                ..
            }
        ));
    }

    #[test]
    fn unknown_keys_and_bad_levels_fail_to_parse() {
        let unknown = RegistryConfig::from_toml_str("[database]\nfile = \"x\"").unwrap_err();
        assert!(matches!(unknown, ConfigError::Parse { .. }));

        let level = RegistryConfig::from_toml_str("[logging]\nlevel = \"loud\"").unwrap_err();
        assert!(matches!(level, ConfigError::Parse { .. }));
    }

    #[test]
    fn explicit_path_wins_over_environment() {
        let resolved = RegistryConfig::resolve_path(Some(Path::new("/etc/tram.toml")));
        assert_eq!(resolved, Some(PathBuf::from("/etc/tram.toml")));
    }

    #[test]
    fn from_file_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tram.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[network]\ndefault_travel_time_minutes = 3").unwrap();

        let config = RegistryConfig::from_file(&path).unwrap();
        assert_eq!(config.default_travel_time(), 3);

        let missing = RegistryConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
