//! Persistence interface consumed by the lifecycle engine.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::JobQueueError;
use crate::types::{now, Job, JobStatus};

/// Durable storage for job records.
///
/// The store does not validate status transitions; the engine is responsible
/// for only writing legal ones.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a fully populated pending job.
    ///
    /// Fails with [`JobQueueError::DuplicateId`] if a job with the same id exists.
    async fn create(&self, job: &Job) -> Result<(), JobQueueError>;

    /// Set the status of a job and bump its `updated_at`, returning the updated record.
    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<Job, JobQueueError>;

    /// Fetch a job by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, JobQueueError>;
}

/// In-memory job store, used in tests and when no database is configured.
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
    unavailable: Arc<AtomicBool>,
}

impl fmt::Debug for MemoryJobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryJobStore")
            .field("jobs", &"<RwLock<HashMap<Uuid, Job>>>")
            .field("unavailable", &self.unavailable.load(Ordering::Relaxed))
            .finish()
    }
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while set, every operation fails with
    /// [`JobQueueError::StoreUnavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), JobQueueError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(JobQueueError::StoreUnavailable(
                "memory store marked unavailable".to_owned(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &Job) -> Result<(), JobQueueError> {
        self.check_available()?;
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(JobQueueError::DuplicateId(job.id));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<Job, JobQueueError> {
        self.check_available()?;
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(JobQueueError::NotFound(id))?;
        job.status = status;
        job.updated_at = job.updated_at.max(now());
        Ok(job.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, JobQueueError> {
        self.check_available()?;
        let jobs = self.jobs.read().await;
        Ok(jobs.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_find() {
        let store = MemoryJobStore::new();
        let job = Job::new("email1", None);
        store.create(&job).await.unwrap();

        let found = store.find_by_id(job.id).await.unwrap();
        assert_eq!(found, Some(job));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let store = MemoryJobStore::new();
        let job = Job::new("email1", None);
        store.create(&job).await.unwrap();

        let err = store.create(&job).await.unwrap_err();
        assert!(matches!(err, JobQueueError::DuplicateId(id) if id == job.id));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn update_status_bumps_updated_at() {
        let store = MemoryJobStore::new();
        let job = Job::new("email1", None);
        store.create(&job).await.unwrap();

        let updated = store
            .update_status(job.id, JobStatus::Processing)
            .await
            .unwrap();
        assert_eq!(updated.status, JobStatus::Processing);
        assert_eq!(updated.created_at, job.created_at);
        assert!(updated.updated_at >= job.updated_at);
    }

    #[tokio::test]
    async fn update_does_not_validate_transitions() {
        let store = MemoryJobStore::new();
        let job = Job::new("email1", None);
        store.create(&job).await.unwrap();

        let updated = store
            .update_status(job.id, JobStatus::Failed)
            .await
            .unwrap();
        assert_eq!(updated.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn update_unknown_job_is_not_found() {
        let store = MemoryJobStore::new();
        let id = Uuid::new_v4();
        let err = store
            .update_status(id, JobStatus::Processing)
            .await
            .unwrap_err();
        assert!(matches!(err, JobQueueError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn find_unknown_job_is_none() {
        let store = MemoryJobStore::new();
        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_operation() {
        let store = MemoryJobStore::new();
        let job = Job::new("email1", None);
        store.create(&job).await.unwrap();
        store.set_unavailable(true);

        assert!(matches!(
            store.create(&Job::new("email2", None)).await,
            Err(JobQueueError::StoreUnavailable(_))
        ));
        assert!(matches!(
            store.update_status(job.id, JobStatus::Processing).await,
            Err(JobQueueError::StoreUnavailable(_))
        ));
        assert!(matches!(
            store.find_by_id(job.id).await,
            Err(JobQueueError::StoreUnavailable(_))
        ));

        store.set_unavailable(false);
        assert!(store.find_by_id(job.id).await.unwrap().is_some());
    }
}
