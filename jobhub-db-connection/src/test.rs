#[cfg(test)]
mod tests {
    use crate::config::{DEFAULT_MAX_CONNECTIONS, DEFAULT_MIN_CONNECTIONS};
    #[cfg(feature = "sqlite")]
    use crate::pool::{is_sqlite_memory_url, sqlite_file_path};
    use crate::utils::config_metadata;
    use crate::*;
    use std::borrow::Cow;

    #[test]
    fn test_config_creation() {
        let config = DbConnectionConfig::new("sqlite::memory:");
        assert_eq!(config.url, "sqlite::memory:");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.min_connections, DEFAULT_MIN_CONNECTIONS);
    }

    #[test]
    fn test_url_sanitization_no_creds() {
        let url = "postgres://localhost:5432/jobs";
        let result = sanitize_database_url(url);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result.as_ref(), url);
    }

    #[test]
    fn test_url_sanitization_with_creds() {
        let url = "postgres://jobs:secret@db:5432/jobs";
        let result = sanitize_database_url(url);
        assert!(matches!(result, Cow::Owned(_)));
        assert_eq!(result.as_ref(), "postgres://****:****@db:5432/jobs");
    }

    #[test]
    fn test_metadata_redacts_credentials() {
        let config = DbConnectionConfig::new("postgres://jobs:secret@db/jobs");
        let meta = config_metadata(&config);
        assert_eq!(meta["database_url"], "postgres://****:****@db/jobs");
        assert_eq!(meta["max_connections"], DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_validate_pool_sizes() {
        let mut config = DbConnectionConfig::new("sqlite::memory:");
        assert!(config.validate().is_ok());

        config.max_connections = 0;
        assert!(matches!(
            config.validate(),
            Err(DbConnectionError::InvalidPoolSize(_))
        ));

        config.max_connections = 2;
        config.min_connections = 3;
        assert!(matches!(
            config.validate(),
            Err(DbConnectionError::InvalidPoolSize(_))
        ));

        let empty = DbConnectionConfig::new("   ");
        assert!(matches!(
            empty.validate(),
            Err(DbConnectionError::EmptyDatabaseUrl)
        ));
    }

    #[test]
    fn test_from_env() {
        let prefix = "JOBHUB_POOLTEST";
        std::env::set_var(format!("{prefix}_DATABASE_URL"), "sqlite::memory:");
        std::env::set_var(format!("{prefix}_DB_MAX_CONNECTIONS"), "4");
        std::env::set_var(format!("{prefix}_DB_TEST_BEFORE_ACQUIRE"), "off");

        let config = DbConnectionConfig::from_env(prefix).expect("config from env");
        assert_eq!(config.max_connections, 4);
        assert!(!config.test_before_acquire);

        std::env::set_var(format!("{prefix}_DB_MAX_CONNECTIONS"), "many");
        assert!(matches!(
            DbConnectionConfig::from_env(prefix),
            Err(DbConnectionError::InvalidNumber { .. })
        ));

        for suffix in ["DATABASE_URL", "DB_MAX_CONNECTIONS", "DB_TEST_BEFORE_ACQUIRE"] {
            std::env::remove_var(format!("{prefix}_{suffix}"));
        }
        assert!(matches!(
            DbConnectionConfig::from_env(prefix),
            Err(DbConnectionError::MissingEnvVar(_))
        ));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_sqlite_memory_detection() {
        assert!(is_sqlite_memory_url("sqlite::memory:"));
        assert!(is_sqlite_memory_url("sqlite://file:jobs?mode=memory&cache=shared"));
        assert!(!is_sqlite_memory_url("sqlite://data/jobhub.sqlite"));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(sqlite_file_path("sqlite://data/jobhub.sqlite"), Some("data/jobhub.sqlite"));
        assert_eq!(sqlite_file_path("sqlite:jobhub.sqlite?mode=rwc"), Some("jobhub.sqlite"));
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
    }

    #[test]
    fn test_const_timeout() {
        let config = DbConnectionConfig {
            connect_timeout_secs: 42,
            ..Default::default()
        };
        assert_eq!(config.connect_timeout(), std::time::Duration::from_secs(42));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_create_pool_creates_sqlite_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("jobhub.sqlite");
        let config = DbConnectionConfig::new(format!("sqlite://{}", path.display()));

        let pool = create_pool(&config).await.expect("create pool");
        let one: (i64,) = sqlx::query_as("SELECT 1")
            .fetch_one(&pool)
            .await
            .expect("query");
        assert_eq!(one.0, 1);
        assert!(path.exists());
    }
}
