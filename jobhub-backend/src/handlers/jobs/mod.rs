pub mod create;
pub mod get;

pub use create::create_job;
pub use get::{get_job, missing_job_id};
