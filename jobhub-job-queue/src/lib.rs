//! Job lifecycle engine used by the backend.
//!
//! A job is submitted with a type and an opaque JSON payload, stored as
//! `pending`, and then driven to `processing` and finally `completed` or
//! `failed` by a detached background task. Callers learn the outcome only by
//! polling.
//!
//! # Architecture
//!
//! - [`JobQueueClient`] - Submits jobs, schedules execution and answers status queries
//! - [`JobStore`] - Persistence interface; [`MemoryJobStore`] is the in-process implementation
//! - [`JobExecutor`] - Trait for implementing the work behind a job type
//! - [`Job`] / [`JobStatus`] - The job record and its state machine
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use jobhub_job_queue::{async_trait, JobExecutor, JobQueueClient, JobQueueError, MemoryJobStore};
//! use serde_json::json;
//!
//! struct SendEmail;
//!
//! #[async_trait]
//! impl JobExecutor for SendEmail {
//!     fn job_type(&self) -> &str {
//!         "email.send"
//!     }
//!
//!     async fn execute(&self, payload: serde_json::Value) -> Result<(), JobQueueError> {
//!         println!("sending email to {}", payload["to"]);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = JobQueueClient::new(Arc::new(MemoryJobStore::new()));
//!     client.register_executor(SendEmail).await;
//!
//!     let job = client
//!         .submit("email.send", Some(json!({ "to": "test1@example.com" })))
//!         .await
//!         .unwrap();
//!     println!("submitted {} ({})", job.id, job.status);
//! }
//! ```

mod client;
mod error;
mod executor;
mod store;
mod types;

pub use client::JobQueueClient;
pub use error::JobQueueError;
pub use executor::{FailingExecutor, JobExecutor, NoOpExecutor, SimulatedExecutor};
pub use store::{JobStore, MemoryJobStore};
pub use types::{now, Job, JobStatus, ParseStatusError};

// Re-export async_trait for convenience when implementing JobExecutor or JobStore
pub use async_trait::async_trait;
