use async_trait::async_trait;
use jobhub_job_queue::{now, Job, JobQueueError, JobStatus, JobStore};
use uuid::Uuid;

use crate::jobs::{self, JobsRow};
use crate::DbPool;

/// [`JobStore`] backed by the `jobs` table.
#[derive(Debug, Clone)]
pub struct SqlJobStore {
    pool: DbPool,
}

impl SqlJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Number of rows in the `jobs` table.
    pub async fn count(&self) -> Result<i64, JobQueueError> {
        jobs::count_jobs(&self.pool).await.map_err(unavailable)
    }
}

fn unavailable(err: sqlx::Error) -> JobQueueError {
    JobQueueError::StoreUnavailable(err.to_string())
}

fn decode(row: JobsRow) -> Result<Job, JobQueueError> {
    row.into_job().map_err(|err| {
        tracing::error!(%err, "failed to decode stored job");
        JobQueueError::StoreUnavailable(err.to_string())
    })
}

#[async_trait]
impl JobStore for SqlJobStore {
    async fn create(&self, job: &Job) -> Result<(), JobQueueError> {
        let row = JobsRow::from_job(job);
        match jobs::insert_job(&self.pool, &row).await {
            Ok(()) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(JobQueueError::DuplicateId(job.id))
            }
            Err(err) => Err(unavailable(err)),
        }
    }

    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<Job, JobQueueError> {
        let row = jobs::update_job_status(&self.pool, &id, status, &now())
            .await
            .map_err(unavailable)?
            .ok_or(JobQueueError::NotFound(id))?;
        decode(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, JobQueueError> {
        jobs::find_by_id(&self.pool, &id)
            .await
            .map_err(unavailable)?
            .map(decode)
            .transpose()
    }
}
