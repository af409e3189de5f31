use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use jobhub_db::{DbConnectionConfig, DbConnectionError, SqlJobStore};
use jobhub_job_queue::{FailingExecutor, JobQueueClient, SimulatedExecutor};

/// Build database connection config from application config.
///
/// When `JOBHUB_DATABASE_URL` is set the pool tuning variables
/// (`JOBHUB_DB_MAX_CONNECTIONS` and friends) are honoured as well.
pub fn database_config_from_config(cfg: &jobhub_config::Config) -> DbConnectionConfig {
    match DbConnectionConfig::from_env("JOBHUB") {
        Ok(config) => config,
        Err(DbConnectionError::MissingEnvVar(_)) => {
            DbConnectionConfig::new(cfg.database.connection_url())
        }
        Err(error) => {
            tracing::warn!(%error, "ignoring database pool environment overrides");
            DbConnectionConfig::new(cfg.database.connection_url())
        }
    }
}

/// Wire the lifecycle engine onto a SQL store using the `[jobs]` section.
///
/// Types listed in `failing_types` always fail; every other type runs the
/// simulated work step for `work_delay_ms`.
pub async fn job_queue_from_config(
    cfg: &jobhub_config::JobsConfig,
    store: SqlJobStore,
) -> JobQueueClient {
    let fallback = SimulatedExecutor::new("*", cfg.work_delay());
    let client = JobQueueClient::with_fallback(Arc::new(store), fallback);
    for job_type in &cfg.failing_types {
        client
            .register_executor(FailingExecutor::new(
                job_type.as_str(),
                format!("job type {job_type} is configured to fail"),
            ))
            .await;
    }
    client
}

/// Parse host:port into a SocketAddr, with fallback to 0.0.0.0.
pub fn parse_bind_address(host: &str, port: u16) -> SocketAddr {
    host.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, port))
        .or_else(|_| host.parse::<SocketAddr>())
        .or_else(|_| host.parse::<Ipv6Addr>().map(|ip| SocketAddr::new(IpAddr::V6(ip), port)))
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)))
}
