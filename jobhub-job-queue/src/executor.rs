//! Job executor trait for implementing job handlers.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::JobQueueError;

/// Trait for implementing job executors.
///
/// Job executors perform the work behind a job. The engine looks an executor
/// up by the job's type and falls back to its default executor when none is
/// registered.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Returns the job type this executor handles.
    fn job_type(&self) -> &str;

    /// Execute the job with the given payload.
    ///
    /// Returns `Ok(())` on success, or an error describing the failure.
    async fn execute(&self, payload: Value) -> Result<(), JobQueueError>;
}

/// A no-op executor that immediately completes jobs.
#[derive(Debug, Default, Clone)]
pub struct NoOpExecutor {
    job_type: String,
}

impl NoOpExecutor {
    pub fn new(job_type: impl Into<String>) -> Self {
        Self {
            job_type: job_type.into(),
        }
    }
}

#[async_trait]
impl JobExecutor for NoOpExecutor {
    fn job_type(&self) -> &str {
        &self.job_type
    }

    async fn execute(&self, _payload: Value) -> Result<(), JobQueueError> {
        Ok(())
    }
}

/// Waits for a fixed delay and then succeeds.
///
/// Stands in for real work: its only observable effect is elapsed time.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    job_type: String,
    delay: Duration,
}

impl SimulatedExecutor {
    /// Default work duration.
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(30);

    pub fn new(job_type: impl Into<String>, delay: Duration) -> Self {
        Self {
            job_type: job_type.into(),
            delay,
        }
    }

    #[inline]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new("*", Self::DEFAULT_DELAY)
    }
}

#[async_trait]
impl JobExecutor for SimulatedExecutor {
    fn job_type(&self) -> &str {
        &self.job_type
    }

    async fn execute(&self, _payload: Value) -> Result<(), JobQueueError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Always fails with the configured reason.
#[derive(Debug, Clone)]
pub struct FailingExecutor {
    job_type: String,
    reason: String,
}

impl FailingExecutor {
    pub fn new(job_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            job_type: job_type.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl JobExecutor for FailingExecutor {
    fn job_type(&self) -> &str {
        &self.job_type
    }

    async fn execute(&self, _payload: Value) -> Result<(), JobQueueError> {
        Err(JobQueueError::ExecutionFailed(self.reason.clone()))
    }
}
