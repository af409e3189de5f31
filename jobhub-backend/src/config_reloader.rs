use std::time::Duration;

use crate::tracing_setup::ReloadHandle;

const RELOAD_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn the background configuration reloader task.
///
/// Re-reads the configuration file periodically. Only the log level is
/// applied live; other changes are reported and take effect on restart.
pub fn spawn_config_reloader(
    config_path: String,
    current: jobhub_config::Config,
    reload_handle: ReloadHandle,
) {
    tokio::spawn(async move {
        let mut current = current;
        let mut interval = tokio::time::interval(RELOAD_INTERVAL);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;

            let new_cfg = match jobhub_config::load_config(Some(&config_path)) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::error!(%e, "failed to reload config file");
                    continue;
                }
            };
            if let Err(e) = jobhub_config::validate_config(&new_cfg) {
                tracing::error!(%e, "loaded config failed validation, ignoring");
                continue;
            }
            if new_cfg == current {
                continue;
            }

            reload_log_level(&current, &new_cfg, &reload_handle);
            if new_cfg.server != current.server
                || new_cfg.database != current.database
                || new_cfg.jobs != current.jobs
            {
                tracing::warn!(
                    "configuration changed; server, database and job settings apply after restart"
                );
            }
            current = new_cfg;
        }
    });
}

fn reload_log_level(
    old: &jobhub_config::Config,
    new: &jobhub_config::Config,
    reload_handle: &ReloadHandle,
) {
    if old.logging.level == new.logging.level || std::env::var("RUST_LOG").is_ok() {
        return;
    }
    match reload_handle(tracing_subscriber::EnvFilter::new(&new.logging.level)) {
        Ok(()) => tracing::info!(level = %new.logging.level, "log level reloaded"),
        Err(e) => tracing::error!(%e, "failed to reload log level"),
    }
}
