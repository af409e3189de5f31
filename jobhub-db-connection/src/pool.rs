#[cfg(feature = "postgres")]
use sqlx::postgres::{PgPool, PgPoolOptions};
#[cfg(feature = "sqlite")]
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::config::DbConnectionConfig;
use crate::error::DbConnectionError;
use crate::utils::sanitize_database_url;

#[cfg(not(any(feature = "postgres", feature = "sqlite")))]
compile_error!("Enable exactly one of the `postgres` or `sqlite` features for jobhub-db-connection.");

#[cfg(all(feature = "postgres", feature = "sqlite"))]
compile_error!("Activate only one backend feature (`postgres` or `sqlite`) for jobhub-db-connection.");

#[cfg(feature = "postgres")]
pub type DbPool = PgPool;
#[cfg(feature = "sqlite")]
pub type DbPool = SqlitePool;

#[cfg(feature = "postgres")]
type DbPoolOptions = PgPoolOptions;
#[cfg(feature = "sqlite")]
type DbPoolOptions = SqlitePoolOptions;

// SQLite memory database patterns
#[cfg(feature = "sqlite")]
pub const SQLITE_MEMORY_PATTERNS: &[&str] = &[":memory:", "mode=memory"];

/// Creates a new backend-specific connection pool using the provided configuration.
pub async fn create_pool(config: &DbConnectionConfig) -> Result<DbPool, DbConnectionError> {
    config.validate()?;
    let url = config.url.trim();

    #[cfg(feature = "sqlite")]
    let (max_connections, min_connections, idle_timeout) = if is_sqlite_memory_url(url) {
        // Every connection to an in-memory database would see its own copy.
        (1, 1, None)
    } else {
        ensure_sqlite_db_file_exists(url)?;
        (
            config.max_connections,
            config.min_connections,
            config.idle_timeout(),
        )
    };
    #[cfg(not(feature = "sqlite"))]
    let (max_connections, min_connections, idle_timeout) = (
        config.max_connections,
        config.min_connections,
        config.idle_timeout(),
    );

    let mut opts = DbPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(min_connections)
        .acquire_timeout(config.connect_timeout());

    #[cfg(not(feature = "sqlite"))]
    {
        opts = opts.test_before_acquire(config.test_before_acquire);
    }

    #[cfg(feature = "sqlite")]
    if is_sqlite_memory_url(url) {
        // Recycling the only connection would drop the database.
        opts = opts.max_lifetime(None);
    }

    if let Some(idle) = idle_timeout {
        opts = opts.idle_timeout(idle);
    }

    tracing::debug!(
        url = %sanitize_database_url(url),
        max_connections,
        min_connections,
        "opening database pool"
    );

    opts.connect(url).await.map_err(Into::into)
}

#[cfg(feature = "sqlite")]
pub fn is_sqlite_memory_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    SQLITE_MEMORY_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

/// Extract the file path from a SQLite connection URL.
/// Returns None for in-memory databases or empty paths.
#[cfg(feature = "sqlite")]
pub fn sqlite_file_path(url: &str) -> Option<&str> {
    if is_sqlite_memory_url(url) {
        return None;
    }

    let mut path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    path = path.strip_prefix("file:").unwrap_or(path);

    if let Some(idx) = path.find('?') {
        path = &path[..idx];
    }

    let path = path.trim();
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

/// Create the database file and its parent directory so sqlx can open it.
#[cfg(feature = "sqlite")]
fn ensure_sqlite_db_file_exists(database_url: &str) -> Result<(), DbConnectionError> {
    use std::fs::{create_dir_all, File};
    use std::path::Path;

    let Some(clean_path) = sqlite_file_path(database_url) else {
        return Ok(());
    };

    let db_path = Path::new(clean_path);
    if let Some(parent) = db_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty() && !p.exists())
    {
        create_dir_all(parent).map_err(|e| {
            DbConnectionError::FileCreation(format!(
                "failed to create parent directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    if !db_path.exists() {
        File::create(db_path).map_err(|e| {
            DbConnectionError::FileCreation(format!(
                "failed to create DB file '{}': {e}",
                db_path.display()
            ))
        })?;
    }

    Ok(())
}
