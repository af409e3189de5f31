use jobhub_job_queue::JobQueueClient;

/// Shared application state passed to every route handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub job_queue: JobQueueClient,
}

impl AppState {
    pub fn new(job_queue: JobQueueClient) -> Self {
        Self { job_queue }
    }
}
