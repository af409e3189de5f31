use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use jobhub_job_queue::Job;
use serde_json::Value;

use crate::{error::ApiError, state::AppState};

/// POST /jobs
/// Submit a job. Responds with the stored `pending` job before any work runs.
pub async fn create_job(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let Json(mut body) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let job_type = match body.get("type") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(ApiError::bad_request("type must be a string")),
        None => return Err(ApiError::bad_request("type is required")),
    };
    let payload = body
        .as_object_mut()
        .and_then(|obj| obj.remove("payload"));

    let job = state.job_queue.submit(job_type, payload).await?;

    Ok((StatusCode::CREATED, Json(job)))
}
