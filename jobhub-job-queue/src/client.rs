//! Job lifecycle engine.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::JobQueueError;
use crate::executor::{JobExecutor, SimulatedExecutor};
use crate::store::JobStore;
use crate::types::{Job, JobStatus};

/// Interface for submitting jobs and observing their progress.
///
/// Submitted jobs are persisted as `pending` and executed on a detached tokio
/// task. Callers observe progress by polling [`JobQueueClient::get`].
#[derive(Clone)]
pub struct JobQueueClient {
    store: Arc<dyn JobStore>,
    executors: Arc<RwLock<HashMap<String, Arc<dyn JobExecutor>>>>,
    fallback: Arc<dyn JobExecutor>,
}

impl fmt::Debug for JobQueueClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueueClient")
            .field("store", &"<Arc<dyn JobStore>>")
            .field(
                "executors",
                &"<RwLock<HashMap<String, Arc<dyn JobExecutor>>>>",
            )
            .field("fallback", &self.fallback.job_type())
            .finish()
    }
}

impl JobQueueClient {
    /// Build a client over `store` whose unregistered job types run the
    /// default [`SimulatedExecutor`].
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self::with_fallback(store, SimulatedExecutor::default())
    }

    /// Build a client over `store` using `fallback` for job types that have
    /// no registered executor.
    pub fn with_fallback<E: JobExecutor + 'static>(store: Arc<dyn JobStore>, fallback: E) -> Self {
        Self {
            store,
            executors: Arc::new(RwLock::new(HashMap::new())),
            fallback: Arc::new(fallback),
        }
    }

    /// Register a job executor for a specific job type.
    pub async fn register_executor<E: JobExecutor + 'static>(&self, executor: E) {
        let job_type = executor.job_type().to_owned();
        let mut executors = self.executors.write().await;
        executors.insert(job_type, Arc::new(executor));
    }

    /// Persist a new pending job and schedule its execution.
    ///
    /// Returns as soon as the job is stored; execution happens on a detached
    /// task. If the store write fails nothing is scheduled.
    pub async fn submit(
        &self,
        job_type: impl Into<String>,
        payload: Option<Value>,
    ) -> Result<Job, JobQueueError> {
        let job_type = job_type.into();
        if job_type.trim().is_empty() {
            return Err(JobQueueError::Validation(
                "job type must be a non-empty string".to_owned(),
            ));
        }

        let job = Job::new(job_type, payload);
        self.store.create(&job).await?;

        let executor = self.executor_for(&job.job_type).await;
        info!(job_id = %job.id, job_type = %job.job_type, "job submitted");

        // Detached: the handle is dropped and nothing joins the task.
        tokio::spawn(run_job(
            Arc::clone(&self.store),
            executor,
            job.id,
            job.payload.clone(),
        ));

        Ok(job)
    }

    /// Fetch the current state of a job.
    pub async fn get(&self, id: Uuid) -> Result<Job, JobQueueError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(JobQueueError::NotFound(id))
    }

    /// Fetch a job by its textual id.
    ///
    /// A blank id is a validation error. A string that is not a UUID cannot
    /// name an issued job and is reported as [`JobQueueError::UnknownId`].
    pub async fn get_str(&self, raw_id: &str) -> Result<Job, JobQueueError> {
        let raw_id = raw_id.trim();
        if raw_id.is_empty() {
            return Err(JobQueueError::Validation("job id is required".to_owned()));
        }
        match Uuid::parse_str(raw_id) {
            Ok(id) => self.get(id).await,
            Err(_) => Err(JobQueueError::UnknownId(raw_id.to_owned())),
        }
    }

    async fn executor_for(&self, job_type: &str) -> Arc<dyn JobExecutor> {
        let executors = self.executors.read().await;
        executors
            .get(job_type)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }
}

/// Drive one job from `pending` to a terminal state.
///
/// Nothing awaits this task, so every failure ends here: work errors become
/// a `failed` status and store errors are logged.
async fn run_job(
    store: Arc<dyn JobStore>,
    executor: Arc<dyn JobExecutor>,
    job_id: Uuid,
    payload: Value,
) {
    if let Err(error) = advance(&*store, job_id, JobStatus::Pending, JobStatus::Processing).await {
        error!(%job_id, %error, "could not mark job as processing; execution abandoned");
        return;
    }

    // Run the work on its own task so a panicking executor still yields a
    // terminal status.
    let outcome = tokio::spawn(async move { executor.execute(payload).await }).await;
    let terminal = match outcome {
        Ok(Ok(())) => JobStatus::Completed,
        Ok(Err(error)) => {
            warn!(%job_id, %error, "job execution failed");
            JobStatus::Failed
        }
        Err(join_error) => {
            warn!(%job_id, error = %join_error, "job executor panicked");
            JobStatus::Failed
        }
    };

    if let Err(error) = advance(&*store, job_id, JobStatus::Processing, terminal).await {
        // No retry: the job stays `processing` as far as callers can tell.
        error!(
            %job_id,
            %error,
            status = %terminal,
            "could not record terminal status; job is stuck in processing"
        );
    }
}

async fn advance(
    store: &dyn JobStore,
    job_id: Uuid,
    from: JobStatus,
    to: JobStatus,
) -> Result<Job, JobQueueError> {
    if !from.can_transition_to(to) {
        return Err(JobQueueError::Validation(format!(
            "illegal transition {from} -> {to}"
        )));
    }
    let job = store.update_status(job_id, to).await?;
    info!(%job_id, %from, %to, "job status changed");
    Ok(job)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::executor::{FailingExecutor, NoOpExecutor};
    use crate::store::MemoryJobStore;

    async fn wait_for_terminal(client: &JobQueueClient, id: Uuid) -> Job {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let job = client.get(id).await.expect("job exists");
            if job.status.is_terminal() {
                return job;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "job {id} did not finish, last status {}",
                job.status
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn client_with(store: &MemoryJobStore, delay_ms: u64) -> JobQueueClient {
        JobQueueClient::with_fallback(
            Arc::new(store.clone()),
            SimulatedExecutor::new("*", Duration::from_millis(delay_ms)),
        )
    }

    /// Wraps a memory store and refuses writes of one particular status.
    struct RefusingStore {
        inner: MemoryJobStore,
        refuse: JobStatus,
    }

    #[async_trait]
    impl JobStore for RefusingStore {
        async fn create(&self, job: &Job) -> Result<(), JobQueueError> {
            self.inner.create(job).await
        }

        async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<Job, JobQueueError> {
            if status == self.refuse {
                return Err(JobQueueError::StoreUnavailable("refused".to_owned()));
            }
            self.inner.update_status(id, status).await
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, JobQueueError> {
            self.inner.find_by_id(id).await
        }
    }

    struct PanickingExecutor;

    #[async_trait]
    impl JobExecutor for PanickingExecutor {
        fn job_type(&self) -> &str {
            "panics"
        }

        async fn execute(&self, _payload: Value) -> Result<(), JobQueueError> {
            panic!("executor bug");
        }
    }

    #[tokio::test]
    async fn submit_returns_pending_job() {
        let store = MemoryJobStore::new();
        let client = client_with(&store, 50);

        let job = client
            .submit("email1", Some(json!({ "to": "test1@example.com" })))
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.created_at, job.updated_at);
        assert_eq!(job.payload, json!({ "to": "test1@example.com" }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn submitted_job_completes() {
        let store = MemoryJobStore::new();
        let client = client_with(&store, 10);

        let job = client.submit("email1", None).await.unwrap();
        let done = wait_for_terminal(&client, job.id).await;

        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.created_at, job.created_at);
        assert!(done.updated_at >= job.updated_at);
    }

    #[tokio::test]
    async fn submit_does_not_wait_for_execution() {
        let store = MemoryJobStore::new();
        let client = client_with(&store, 60_000);

        let job = tokio::time::timeout(Duration::from_secs(1), client.submit("slow", None))
            .await
            .expect("submit returned before the work finished")
            .unwrap();

        assert!(!client.get(job.id).await.unwrap().status.is_terminal());
    }

    #[tokio::test]
    async fn registered_executor_is_used_for_its_type() {
        let store = MemoryJobStore::new();
        let client = client_with(&store, 60_000);
        client.register_executor(NoOpExecutor::new("quick")).await;

        let job = client.submit("quick", None).await.unwrap();
        assert_eq!(
            wait_for_terminal(&client, job.id).await.status,
            JobStatus::Completed
        );
    }

    #[tokio::test]
    async fn work_error_marks_job_failed() {
        let store = MemoryJobStore::new();
        let client = client_with(&store, 10);
        client
            .register_executor(FailingExecutor::new("broken", "boom"))
            .await;

        let job = client.submit("broken", None).await.unwrap();
        assert_eq!(
            wait_for_terminal(&client, job.id).await.status,
            JobStatus::Failed
        );
    }

    #[tokio::test]
    async fn panicking_executor_marks_job_failed() {
        let store = MemoryJobStore::new();
        let client = client_with(&store, 10);
        client.register_executor(PanickingExecutor).await;

        let job = client.submit("panics", None).await.unwrap();
        assert_eq!(
            wait_for_terminal(&client, job.id).await.status,
            JobStatus::Failed
        );
    }

    #[tokio::test]
    async fn terminal_state_is_stable() {
        let store = MemoryJobStore::new();
        let client = client_with(&store, 5);

        let job = client.submit("email1", None).await.unwrap();
        let done = wait_for_terminal(&client, job.id).await;

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(client.get(job.id).await.unwrap(), done);
        }
    }

    #[tokio::test]
    async fn observed_statuses_follow_the_state_machine() {
        let store = MemoryJobStore::new();
        let client = client_with(&store, 30);

        let job = client.submit("email1", None).await.unwrap();
        let mut observed = vec![job.status];
        loop {
            let status = client.get(job.id).await.unwrap().status;
            if observed.last() != Some(&status) {
                observed.push(status);
            }
            if status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        for pair in observed.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "illegal observed transition {} -> {}",
                pair[0],
                pair[1]
            );
        }
        assert_eq!(observed.last(), Some(&JobStatus::Completed));
    }

    #[tokio::test]
    async fn blank_type_is_rejected_without_a_record() {
        let store = MemoryJobStore::new();
        let client = client_with(&store, 10);

        for job_type in ["", "   "] {
            let err = client.submit(job_type, None).await.unwrap_err();
            assert!(matches!(err, JobQueueError::Validation(_)));
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn store_failure_on_submit_schedules_nothing() {
        let store = MemoryJobStore::new();
        let client = client_with(&store, 0);
        store.set_unavailable(true);

        let err = client.submit("email1", None).await.unwrap_err();
        assert!(matches!(err, JobQueueError::StoreUnavailable(_)));

        store.set_unavailable(false);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn failed_processing_write_leaves_job_pending() {
        let inner = MemoryJobStore::new();
        let store = Arc::new(RefusingStore {
            inner: inner.clone(),
            refuse: JobStatus::Processing,
        });
        let client = JobQueueClient::with_fallback(store, NoOpExecutor::new("*"));

        let job = client.submit("email1", None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(client.get(job.id).await.unwrap().status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn failed_terminal_write_leaves_job_processing() {
        let inner = MemoryJobStore::new();
        let store = Arc::new(RefusingStore {
            inner: inner.clone(),
            refuse: JobStatus::Completed,
        });
        let client = JobQueueClient::with_fallback(store, NoOpExecutor::new("*"));

        let job = client.submit("email1", None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(
            client.get(job.id).await.unwrap().status,
            JobStatus::Processing
        );
    }

    #[tokio::test]
    async fn get_reports_missing_and_blank_ids() {
        let store = MemoryJobStore::new();
        let client = client_with(&store, 10);

        let id = Uuid::new_v4();
        assert!(matches!(client.get(id).await, Err(JobQueueError::NotFound(missing)) if missing == id));
        assert!(matches!(
            client.get_str("").await,
            Err(JobQueueError::Validation(_))
        ));
        let err = client.get_str(" not-a-uuid ").await.unwrap_err();
        assert!(matches!(&err, JobQueueError::UnknownId(raw) if raw == "not-a-uuid"));
        assert_eq!(err.to_string(), "job not found: not-a-uuid");

        let job = client.submit("email1", None).await.unwrap();
        assert_eq!(client.get_str(&job.id.to_string()).await.unwrap().id, job.id);
    }

    #[tokio::test]
    async fn advance_rejects_illegal_transitions() {
        let store = MemoryJobStore::new();
        let job = Job::new("email1", None);
        store.create(&job).await.unwrap();

        let err = advance(&store, job.id, JobStatus::Pending, JobStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, JobQueueError::Validation(_)));
        assert_eq!(
            store.find_by_id(job.id).await.unwrap().unwrap().status,
            JobStatus::Pending
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_finish_independently() {
        let store = MemoryJobStore::new();
        let client = client_with(&store, 10);
        client
            .register_executor(FailingExecutor::new("broken", "boom"))
            .await;

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let client = client.clone();
                tokio::spawn(async move {
                    let job_type = if i % 5 == 0 { "broken" } else { "email" };
                    client.submit(job_type, Some(json!({ "n": i }))).await
                })
            })
            .collect();

        let mut jobs = Vec::new();
        for handle in handles {
            jobs.push(handle.await.unwrap().unwrap());
        }

        let ids: HashSet<Uuid> = jobs.iter().map(|job| job.id).collect();
        assert_eq!(ids.len(), 50);

        for job in jobs {
            let done = wait_for_terminal(&client, job.id).await;
            let expected = if job.job_type == "broken" {
                JobStatus::Failed
            } else {
                JobStatus::Completed
            };
            assert_eq!(done.status, expected);
        }
        assert_eq!(store.len().await, 50);
    }
}
