//! jobhub backend server
//!
//! Entry point for the jobhub-backend server: configuration loading,
//! database migrations, job engine wiring and HTTP server startup.

use std::sync::Arc;

use jobhub_backend::state::AppState;
use jobhub_db::{config_metadata, sanitize_database_url, SqlJobStore};
use tokio::net::TcpListener;

mod cli;
mod config_helpers;
mod config_reloader;
mod tracing_setup;

use cli::CliArgs;
use config_helpers::{database_config_from_config, job_queue_from_config, parse_bind_address};
use tracing_setup::install_tracing_from_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    eprintln!("[STARTUP] jobhub backend starting...");
    let args = CliArgs::parse();

    if args.help_requested {
        CliArgs::print_help();
        return Ok(());
    }

    // Resolve config path: CLI > environment variable
    let config_path = args
        .config_path
        .or_else(|| std::env::var("JOBHUB_CONFIG_PATH").ok());

    eprintln!("[STARTUP] Loading config from: {:?}", config_path);
    let config = load_config(&config_path)?;
    eprintln!("[STARTUP] Config loaded successfully");

    // Initialize tracing
    eprintln!("[STARTUP] Initializing tracing...");
    let reload_handle = install_tracing_from_config(&config.logging);
    eprintln!("[STARTUP] Tracing initialized");

    // Create and migrate database
    eprintln!("[STARTUP] Setting up database...");
    let db_cfg = database_config_from_config(&config);
    let db_pool = jobhub_db::create_pool(&db_cfg).await?;
    eprintln!("[STARTUP] Database pool created");
    run_migrations(&db_cfg, &db_pool).await?;
    eprintln!("[STARTUP] Database migrations completed");

    tracing::info!(
        db = %config_metadata(&db_cfg),
        work_delay_ms = config.jobs.work_delay_ms,
        failing_types = ?config.jobs.failing_types,
        "database and job configuration"
    );

    // Wire the job engine onto the SQL store
    eprintln!("[STARTUP] Initializing job engine...");
    let job_queue = job_queue_from_config(&config.jobs, SqlJobStore::new(db_pool)).await;
    let state = Arc::new(AppState::new(job_queue));
    eprintln!("[STARTUP] AppState created");

    if let Some(path) = config_path.clone() {
        config_reloader::spawn_config_reloader(path, config.clone(), reload_handle);
        eprintln!("[STARTUP] Config reloader spawned");
    }

    eprintln!("[STARTUP] Building application router...");
    let app = jobhub_backend::build_router(state);
    eprintln!("[STARTUP] Router built successfully");

    // Start server
    eprintln!(
        "[STARTUP] Binding to {}:{}",
        config.server.host, config.server.port
    );
    let addr = parse_bind_address(&config.server.host, config.server.port);
    eprintln!("[STARTUP] Parsed address: {:?}", addr);

    let listener = TcpListener::bind(addr).await?;
    eprintln!(
        "[STARTUP] Server listening on {}:{}",
        config.server.host, config.server.port
    );
    eprintln!("[STARTUP] Ready to accept connections!");
    tracing::info!(%addr, "jobhub backend listening");

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Load configuration from file or defaults, then validate it.
fn load_config(path: &Option<String>) -> anyhow::Result<jobhub_config::Config> {
    let loaded = match path.as_deref() {
        Some(p) => jobhub_config::load_config(Some(p)),
        None => jobhub_config::load_config::<&std::path::Path>(None),
    };
    let config = loaded.map_err(|e| {
        eprintln!("failed to load configuration: {e}");
        anyhow::anyhow!(e.to_string())
    })?;
    jobhub_config::validate_config(&config).map_err(|e| {
        eprintln!("invalid configuration: {e}");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(config)
}

/// Run the migrations matching the database URL.
async fn run_migrations(
    db_cfg: &jobhub_db::DbConnectionConfig,
    db_pool: &jobhub_db::DbPool,
) -> anyhow::Result<()> {
    let db_url = sanitize_database_url(&db_cfg.url);
    tracing::info!(%db_url, "applying database migrations");

    match jobhub_migrations::migrator_for_url(&db_cfg.url).run(db_pool).await {
        Ok(()) => {
            tracing::info!("database migrations applied successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!(%e, "failed to apply database migrations");
            Err(anyhow::anyhow!("failed to apply database migrations: {e}"))
        }
    }
}
