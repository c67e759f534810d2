//! Job DTOs for the operator surface

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::{Job, JobStatus};

/// Compact job listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub queue: String,
    pub seq: i64,
    pub status: JobStatus,
    pub progress: u8,
    pub attempts_made: u32,
    pub enqueued_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            queue: job.queue.clone(),
            seq: job.seq,
            status: job.status,
            progress: job.progress,
            attempts_made: job.attempts_made,
            enqueued_at: job.enqueued_at,
            finished_at: job.finished_at,
        }
    }
}

/// Query filter for job listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobListQuery {
    pub status: Option<JobStatus>,
}
