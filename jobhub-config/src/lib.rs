use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Pre-compiled regex for hostname validation (compiled once at first use)
static HOSTNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][-a-zA-Z0-9\.]*[a-zA-Z0-9]$").unwrap());

#[derive(Debug, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub logging: Option<LoggingSection>,
    #[serde(default)]
    pub database: Option<DatabaseSection>,
    #[serde(default)]
    pub jobs: Option<JobsSection>,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub json: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSection {
    pub driver: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub ssl_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JobsSection {
    /// Duration of the simulated work step for job types without a dedicated executor.
    #[serde(default)]
    pub work_delay_ms: Option<u64>,
    /// Job types whose execution always fails.
    #[serde(default)]
    pub failing_types: Option<Vec<String>>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Load a RawConfigFile from a path. The format is inferred from the extension: .toml, .yaml/.yml, .json
pub fn load_raw_from_file<P: AsRef<Path>>(path: P) -> Result<RawConfigFile, ConfigError> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    parse_config_str(&s, ext.as_deref())
}

/// Parse configuration from a string with optional format hint
fn parse_config_str(s: &str, ext: Option<&str>) -> Result<RawConfigFile, ConfigError> {
    match ext {
        #[cfg(feature = "toml")]
        Some("toml") => toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        #[cfg(feature = "yaml")]
        Some("yaml" | "yml") => {
            serde_yaml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
        }
        #[cfg(feature = "json")]
        Some("json") => serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        _ => parse_config_auto(s),
    }
}

/// Try each enabled format in turn
fn parse_config_auto(s: &str) -> Result<RawConfigFile, ConfigError> {
    #[cfg(feature = "json")]
    if let Ok(cfg) = serde_json::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "toml")]
    if let Ok(cfg) = toml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "yaml")]
    if let Ok(cfg) = serde_yaml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(any(feature = "yaml", feature = "toml", feature = "json"))]
    {
        Err(ConfigError::Parse(
            "failed to parse config as any supported format".into(),
        ))
    }

    #[cfg(not(any(feature = "yaml", feature = "toml", feature = "json")))]
    {
        let _ = s;
        Err(ConfigError::Parse("no config format enabled".into()))
    }
}

/// Concrete application configuration with defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseConfig {
    pub driver: String,
    pub path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub ssl_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobsConfig {
    pub work_delay_ms: u64,
    pub failing_types: Vec<String>,
}

impl JobsConfig {
    #[inline]
    pub fn work_delay(&self) -> Duration {
        Duration::from_millis(self.work_delay_ms)
    }
}

impl DatabaseConfig {
    /// Build the SQLx connection URL for this database.
    ///
    /// For sqlite, `path` may already be a full URL (`sqlite:...`) or a plain
    /// file path. For postgres, an explicit URL in `path` wins over the
    /// individual connection fields.
    pub fn connection_url(&self) -> String {
        match self.driver.as_str() {
            "sqlite" => {
                let path = self.path.as_deref().unwrap_or("jobhub.sqlite");
                if path.starts_with("sqlite:") {
                    path.to_string()
                } else {
                    format!("sqlite://{path}")
                }
            }
            _ => {
                if let Some(url) = self.path.as_deref().filter(|p| p.contains("://")) {
                    return url.to_string();
                }
                let credentials = match (&self.username, &self.password) {
                    (Some(user), Some(pass)) => format!("{user}:{pass}@"),
                    (Some(user), None) => format!("{user}@"),
                    _ => String::new(),
                };
                let host = self.host.as_deref().unwrap_or("localhost");
                let port = self.port.unwrap_or(5432);
                let database = self.database.as_deref().unwrap_or("jobhub");
                let mut url = format!("postgres://{credentials}{host}:{port}/{database}");
                if let Some(mode) = &self.ssl_mode {
                    url.push_str("?sslmode=");
                    url.push_str(mode);
                }
                url
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
            database: DatabaseConfig {
                driver: "sqlite".to_string(),
                path: Some("jobhub.sqlite".to_string()),
                host: None,
                port: None,
                database: None,
                username: None,
                password: None,
                ssl_mode: None,
            },
            jobs: JobsConfig {
                work_delay_ms: 30_000,
                failing_types: Vec::new(),
            },
        }
    }
}

fn parse_bool(s: &str) -> Result<bool, ()> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        _ => Err(()),
    }
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Helper macro to apply optional value if present
macro_rules! apply_opt {
    ($target:expr, $source:expr) => {
        if let Some(v) = $source {
            $target = v;
        }
    };
}

/// Helper macro to apply option field directly if it has a value
macro_rules! apply_opt_field {
    ($target:expr, $source:expr) => {
        if $source.is_some() {
            $target = $source;
        }
    };
}

/// Load concrete `Config` from optional file and environment variables.
/// Environment variables take precedence over file values and defaults.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = path {
        let raw = load_raw_from_file(p)?;
        if let Some(server) = raw.server {
            apply_opt!(cfg.server.host, server.host);
            apply_opt!(cfg.server.port, server.port);
        }
        if let Some(logging) = raw.logging {
            apply_opt!(cfg.logging.level, logging.level);
            apply_opt!(cfg.logging.json, logging.json);
        }
        if let Some(db) = raw.database {
            cfg.database.driver = db.driver;
            apply_opt_field!(cfg.database.path, db.path);
            apply_opt_field!(cfg.database.host, db.host);
            apply_opt_field!(cfg.database.port, db.port);
            apply_opt_field!(cfg.database.database, db.database);
            apply_opt_field!(cfg.database.username, db.username);
            apply_opt_field!(cfg.database.password, db.password);
            apply_opt_field!(cfg.database.ssl_mode, db.ssl_mode);
        }
        if let Some(jobs) = raw.jobs {
            apply_opt!(cfg.jobs.work_delay_ms, jobs.work_delay_ms);
            apply_opt!(cfg.jobs.failing_types, jobs.failing_types);
        }
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Parse(format!("invalid {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

fn env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(v) => parse_bool(&v)
            .map(Some)
            .map_err(|_| ConfigError::Parse(format!("invalid {key}"))),
        Err(_) => Ok(None),
    }
}

#[inline]
fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Apply all environment variable overrides to config
fn apply_env_overrides(cfg: &mut Config) -> Result<(), ConfigError> {
    // Server
    if let Some(v) = env_str("JOBHUB_SERVER_HOST") {
        cfg.server.host = v;
    }
    if let Some(v) = env_parse::<u16>("JOBHUB_SERVER_PORT")? {
        cfg.server.port = v;
    }

    // Logging
    if let Some(v) = env_str("JOBHUB_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = env_bool("JOBHUB_LOG_JSON")? {
        cfg.logging.json = v;
    }

    // Database
    if let Some(v) = env_str("JOBHUB_DATABASE_DRIVER") {
        cfg.database.driver = v;
    }
    if let Some(v) = env_str("JOBHUB_DATABASE_PATH") {
        cfg.database.path = Some(v);
    }
    if let Some(v) = env_str("JOBHUB_DATABASE_HOST") {
        cfg.database.host = Some(v);
    }
    if let Some(v) = env_parse::<u16>("JOBHUB_DATABASE_PORT")? {
        cfg.database.port = Some(v);
    }
    if let Some(v) = env_str("JOBHUB_DATABASE_NAME") {
        cfg.database.database = Some(v);
    }
    if let Some(v) = env_str("JOBHUB_DATABASE_USERNAME") {
        cfg.database.username = Some(v);
    }
    if let Some(v) = env_str("JOBHUB_DATABASE_PASSWORD") {
        cfg.database.password = Some(v);
    }
    if let Some(v) = env_str("JOBHUB_DATABASE_SSL_MODE") {
        cfg.database.ssl_mode = Some(v);
    }
    // A full URL also selects the matching driver
    if let Some(v) = env_str("JOBHUB_DATABASE_URL") {
        if v.starts_with("postgres") {
            cfg.database.driver = "postgres".to_string();
        } else if v.starts_with("sqlite") {
            cfg.database.driver = "sqlite".to_string();
        }
        cfg.database.path = Some(v);
    }

    // Jobs
    if let Some(v) = env_parse::<u64>("JOBHUB_JOB_WORK_DELAY_MS")? {
        cfg.jobs.work_delay_ms = v;
    }
    if let Some(v) = env_str("JOBHUB_JOB_FAILING_TYPES") {
        cfg.jobs.failing_types = split_csv(&v);
    }

    Ok(())
}

/// Validate higher-level constraints on the resolved configuration.
pub fn validate_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.server.port == 0 {
        return Err(ConfigError::Validation("server.port must be > 0".into()));
    }
    let host_ok = cfg.server.host.parse::<std::net::IpAddr>().is_ok()
        || HOSTNAME_REGEX.is_match(&cfg.server.host);
    if !host_ok {
        return Err(ConfigError::Validation(format!(
            "invalid server.host: {}",
            cfg.server.host
        )));
    }

    match cfg.database.driver.as_str() {
        "sqlite" | "postgres" => {}
        other => {
            return Err(ConfigError::Validation(format!(
                "unsupported database driver: {other}"
            )))
        }
    }
    // postgres needs a host and database unless a full URL was supplied
    let has_url = cfg
        .database
        .path
        .as_deref()
        .is_some_and(|p| p.contains("://"));
    if cfg.database.driver == "postgres" && !has_url {
        if cfg.database.host.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Validation(
                "database.host must be set for non-sqlite drivers".to_string(),
            ));
        }
        if cfg.database.database.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Validation(
                "database.database must be set for non-sqlite drivers".to_string(),
            ));
        }
    }

    if cfg.jobs.failing_types.iter().any(|t| t.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "jobs.failing_types must not contain empty names".to_string(),
        ));
    }
    Ok(())
}
