use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::Json;
use jobhub_job_queue::Job;

use crate::{error::ApiError, state::AppState};

/// GET /jobs/{id}
pub async fn get_job(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let job = state.job_queue.get_str(&id).await?;

    Ok(Json(job))
}

/// GET /jobs/
/// The id segment is empty.
pub async fn missing_job_id() -> ApiError {
    ApiError::bad_request("job id is required")
}
