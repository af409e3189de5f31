#[cfg(not(any(feature = "postgres", feature = "sqlite")))]
compile_error!("Enable exactly one of the `postgres` or `sqlite` features for jobhub-db.");

#[cfg(all(feature = "postgres", feature = "sqlite"))]
compile_error!("Activate only one backend feature (`postgres` or `sqlite`) for jobhub-db.");

#[cfg(feature = "postgres")]
pub type DbBackend = sqlx::Postgres;
#[cfg(feature = "sqlite")]
pub type DbBackend = sqlx::Sqlite;

pub mod jobs;
mod store;

pub use jobhub_db_connection::{
    config_metadata, create_pool, sanitize_database_url, DbConnectionConfig, DbConnectionError,
    DbPool,
};
pub use store::SqlJobStore;
