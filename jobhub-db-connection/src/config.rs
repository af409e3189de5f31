use std::env::{self, VarError};
use std::time::Duration;

use serde::Deserialize;

use crate::error::DbConnectionError;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
const DEFAULT_TEST_BEFORE_ACQUIRE: bool = true;

/// Basic configuration for creating a SQLx connection pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConnectionConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: Option<u64>,
    pub test_before_acquire: bool,
}

impl Default for DbConnectionConfig {
    #[inline]
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            idle_timeout_secs: Some(DEFAULT_IDLE_TIMEOUT_SECS),
            test_before_acquire: DEFAULT_TEST_BEFORE_ACQUIRE,
        }
    }
}

impl DbConnectionConfig {
    /// Creates a new configuration with the provided URL and sane defaults.
    #[inline]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from environment variables using the supplied prefix.
    ///
    /// Expected variables:
    /// - `{PREFIX}_DATABASE_URL` (required)
    /// - `{PREFIX}_DB_MAX_CONNECTIONS` (optional)
    /// - `{PREFIX}_DB_MIN_CONNECTIONS` (optional)
    /// - `{PREFIX}_DB_CONNECT_TIMEOUT_SECS` (optional)
    /// - `{PREFIX}_DB_IDLE_TIMEOUT_SECS` (optional)
    /// - `{PREFIX}_DB_TEST_BEFORE_ACQUIRE` (optional, bool)
    pub fn from_env(prefix: &str) -> Result<Self, DbConnectionError> {
        let url_var = format!("{prefix}_DATABASE_URL");
        let url = env::var(&url_var).map_err(|_| DbConnectionError::MissingEnvVar(url_var))?;
        if url.trim().is_empty() {
            return Err(DbConnectionError::EmptyDatabaseUrl);
        }

        let mut config = Self::new(url);

        if let Some(max) = read_env(prefix, "DB_MAX_CONNECTIONS")? {
            config.max_connections = parse_number(prefix, "DB_MAX_CONNECTIONS", &max)?;
        }
        if let Some(min) = read_env(prefix, "DB_MIN_CONNECTIONS")? {
            config.min_connections = parse_number(prefix, "DB_MIN_CONNECTIONS", &min)?;
        }
        if let Some(timeout) = read_env(prefix, "DB_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout_secs = parse_number(prefix, "DB_CONNECT_TIMEOUT_SECS", &timeout)?;
        }
        if let Some(idle) = read_env(prefix, "DB_IDLE_TIMEOUT_SECS")? {
            config.idle_timeout_secs = Some(parse_number(prefix, "DB_IDLE_TIMEOUT_SECS", &idle)?);
        }
        if let Some(value) = read_env(prefix, "DB_TEST_BEFORE_ACQUIRE")? {
            config.test_before_acquire = parse_bool(prefix, "DB_TEST_BEFORE_ACQUIRE", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check pool sizing constraints.
    pub fn validate(&self) -> Result<(), DbConnectionError> {
        if self.url.trim().is_empty() {
            return Err(DbConnectionError::EmptyDatabaseUrl);
        }
        if self.max_connections == 0 {
            return Err(DbConnectionError::InvalidPoolSize(
                "max_connections must be greater than 0".to_owned(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(DbConnectionError::InvalidPoolSize(
                "min_connections must not exceed max_connections".to_owned(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[inline]
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

/// Read `{prefix}_{suffix}`, treating unset and blank values as absent.
fn read_env(prefix: &str, suffix: &str) -> Result<Option<String>, DbConnectionError> {
    let var = format!("{prefix}_{suffix}");
    match env::var(&var) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value.trim().to_owned())),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(DbConnectionError::InvalidUnicode(var)),
    }
}

fn parse_number<T: std::str::FromStr<Err = std::num::ParseIntError>>(
    prefix: &str,
    suffix: &str,
    raw: &str,
) -> Result<T, DbConnectionError> {
    raw.parse().map_err(|source| DbConnectionError::InvalidNumber {
        var: format!("{prefix}_{suffix}"),
        source,
    })
}

fn parse_bool(prefix: &str, suffix: &str, raw: &str) -> Result<bool, DbConnectionError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DbConnectionError::InvalidBoolean {
            var: format!("{prefix}_{suffix}"),
            value: raw.to_owned(),
        }),
    }
}
