use axum::{http::StatusCode, response::IntoResponse, Json};
use jobhub_job_queue::JobQueueError;
use serde_json::json;
use thiserror::Error;

/// Top-level API error shared by all route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    JobQueue(#[from] JobQueueError),
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::JobQueue(err) => match err {
                JobQueueError::Validation(_) => StatusCode::BAD_REQUEST,
                JobQueueError::NotFound(_) | JobQueueError::UnknownId(_) => StatusCode::NOT_FOUND,
                JobQueueError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                JobQueueError::DuplicateId(_) | JobQueueError::ExecutionFailed(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            ApiError::JobQueue(JobQueueError::NotFound(_) | JobQueueError::UnknownId(_)) => {
                "job not found".to_owned()
            }
            ApiError::JobQueue(JobQueueError::StoreUnavailable(reason)) => {
                tracing::error!(%reason, "job store unavailable");
                "job store unavailable".to_owned()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
