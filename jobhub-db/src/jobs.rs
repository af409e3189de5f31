//! Queries over the `jobs` table.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that text
//! comparison matches chronological order on every backend.

use chrono::{DateTime, SecondsFormat, Utc};
use jobhub_job_queue::{Job, JobStatus};
use sqlx::Executor;
use uuid::Uuid;

use crate::DbBackend;

#[cfg(feature = "sqlite")]
mod sql {
    pub const INSERT: &str = "INSERT INTO jobs (id, type, payload, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)";
    pub const UPDATE_STATUS: &str = "UPDATE jobs SET status = ?, updated_at = MAX(updated_at, ?) WHERE id = ? \
         RETURNING id, type, payload, status, created_at, updated_at";
    pub const FIND_BY_ID: &str =
        "SELECT id, type, payload, status, created_at, updated_at FROM jobs WHERE id = ?";
    pub const COUNT: &str = "SELECT COUNT(*) FROM jobs";
}

#[cfg(feature = "postgres")]
mod sql {
    pub const INSERT: &str = "INSERT INTO jobs (id, type, payload, status, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6)";
    pub const UPDATE_STATUS: &str = "UPDATE jobs SET status = $1, updated_at = GREATEST(updated_at, $2) WHERE id = $3 \
         RETURNING id, type, payload, status, created_at, updated_at";
    pub const FIND_BY_ID: &str =
        "SELECT id, type, payload, status, created_at, updated_at FROM jobs WHERE id = $1";
    pub const COUNT: &str = "SELECT COUNT(*) FROM jobs";
}

/// A row of the `jobs` table as stored.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct JobsRow {
    pub id: String,
    #[sqlx(rename = "type")]
    pub job_type: String,
    pub payload: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A stored row that cannot be turned back into a [`Job`].
#[derive(Debug, thiserror::Error)]
#[error("corrupt jobs row {id}: {reason}")]
pub struct CorruptRow {
    pub id: String,
    pub reason: String,
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

impl JobsRow {
    pub fn from_job(job: &Job) -> Self {
        Self {
            id: job.id.to_string(),
            job_type: job.job_type.clone(),
            payload: job.payload.to_string(),
            status: job.status.to_string(),
            created_at: format_timestamp(&job.created_at),
            updated_at: format_timestamp(&job.updated_at),
        }
    }

    pub fn into_job(self) -> Result<Job, CorruptRow> {
        let corrupt = |reason: String| CorruptRow {
            id: self.id.clone(),
            reason,
        };

        let id = Uuid::parse_str(&self.id).map_err(|e| corrupt(format!("id: {e}")))?;
        let payload =
            serde_json::from_str(&self.payload).map_err(|e| corrupt(format!("payload: {e}")))?;
        let status = self
            .status
            .parse::<JobStatus>()
            .map_err(|e| corrupt(e.to_string()))?;
        let created_at =
            parse_timestamp(&self.created_at).map_err(|e| corrupt(format!("created_at: {e}")))?;
        let updated_at =
            parse_timestamp(&self.updated_at).map_err(|e| corrupt(format!("updated_at: {e}")))?;

        Ok(Job {
            id,
            job_type: self.job_type,
            payload,
            status,
            created_at,
            updated_at,
        })
    }
}

pub async fn insert_job<'e, E>(executor: E, row: &JobsRow) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    sqlx::query(sql::INSERT)
        .bind(&row.id)
        .bind(&row.job_type)
        .bind(&row.payload)
        .bind(&row.status)
        .bind(&row.created_at)
        .bind(&row.updated_at)
        .execute(executor)
        .await
        .map(|_| ())
}

/// Set `status` and move `updated_at` forward to `at` (never backwards).
///
/// Returns `None` when no row has the given id.
pub async fn update_job_status<'e, E>(
    executor: E,
    id: &Uuid,
    status: JobStatus,
    at: &DateTime<Utc>,
) -> Result<Option<JobsRow>, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    sqlx::query_as::<_, JobsRow>(sql::UPDATE_STATUS)
        .bind(status.as_str())
        .bind(format_timestamp(at))
        .bind(id.to_string())
        .fetch_optional(executor)
        .await
}

pub async fn find_by_id<'e, E>(executor: E, id: &Uuid) -> Result<Option<JobsRow>, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    sqlx::query_as::<_, JobsRow>(sql::FIND_BY_ID)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await
}

pub async fn count_jobs<'e, E>(executor: E) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    sqlx::query_scalar(sql::COUNT).fetch_one(executor).await
}
