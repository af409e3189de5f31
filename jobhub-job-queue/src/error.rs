//! Error types for the job lifecycle engine.

use thiserror::Error;
use uuid::Uuid;

/// Errors that may occur while submitting, storing or executing jobs.
#[derive(Debug, Error)]
pub enum JobQueueError {
    #[error("invalid job: {0}")]
    Validation(String),

    #[error("job not found: {0}")]
    NotFound(Uuid),

    #[error("job not found: {0}")]
    UnknownId(String),

    #[error("job already exists: {0}")]
    DuplicateId(Uuid),

    #[error("job store is unavailable: {0}")]
    StoreUnavailable(String),

    #[error("job execution failed: {0}")]
    ExecutionFailed(String),
}
