use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit, extract::Extension, http::StatusCode, response::IntoResponse,
    routing::get, routing::post, Router,
};

use crate::handlers::jobs;
use crate::state::AppState;

// Job submissions are small JSON documents
const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Build the primary axum router with the provided shared application state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/jobs", post(jobs::create_job))
        .route("/jobs/", get(jobs::missing_job_id))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
        .layer(Extension(state));

    Router::new().nest("/api", router)
}

async fn health_handler() -> impl IntoResponse {
    // Liveness: always return 200 OK when process is alive.
    (StatusCode::OK, "OK")
}

async fn ready_handler(Extension(_state): Extension<Arc<AppState>>) -> impl IntoResponse {
    // Readiness: the state extension only exists once the store and engine are wired.
    (StatusCode::OK, "OK")
}
