//! Job Queue
//!
//! Durable FIFO queue of deferred work. Producers enqueue a payload, workers
//! claim the oldest claimable job, report progress and logs, then complete or
//! fail it. Failed jobs are redelivered after their backoff while attempts
//! remain.

pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use motormart_core::domain::job::{Job, JobCounts, JobOptions, JobStatus};
use motormart_core::domain::log::LogEntry;
use motormart_core::outcome::Reply;
use uuid::Uuid;

use crate::error::Result;

pub use postgres::PgJobQueue;

pub const STALLED_REASON: &str = "job stalled more than allowable limit";

/// Result of one stalled-job sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StalledJobs {
    pub requeued: u64,
    pub failed: u64,
}

impl StalledJobs {
    pub fn is_empty(&self) -> bool {
        self.requeued == 0 && self.failed == 0
    }
}

/// Queue backend
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Persist a new `Waiting` job at the tail of `queue`
    async fn enqueue(
        &self,
        queue: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Result<Job>;

    /// Atomically move the oldest claimable job of `queue` to `Active`
    ///
    /// Each job is handed to at most one worker per delivery attempt.
    async fn claim_next(&self, queue: &str, worker_id: &str) -> Result<Option<Job>>;

    /// Raise the progress of a job; lower values are ignored
    async fn update_progress(&self, id: Uuid, progress: u8) -> Result<()>;

    async fn append_logs(&self, id: Uuid, entries: Vec<LogEntry>) -> Result<()>;

    /// Mark a job `Completed` with the handler's reply
    async fn complete(&self, id: Uuid, result: Reply) -> Result<Job>;

    /// Record a failed attempt
    ///
    /// The job goes back to `Waiting` after its backoff when attempts remain,
    /// otherwise it becomes `Failed`.
    async fn fail(&self, id: Uuid, reason: &str, result: Option<Reply>) -> Result<Job>;

    /// Sweep `Active` jobs claimed before `started_before`
    ///
    /// A stalled job goes back to `Waiting` while it has stalled fewer than
    /// `max_stalled` times; after that it is `Failed` with [`STALLED_REASON`].
    async fn requeue_stalled(
        &self,
        queue: &str,
        started_before: DateTime<Utc>,
        max_stalled: u32,
    ) -> Result<StalledJobs>;

    /// Put a `Failed` job back in line with a fresh attempt budget
    async fn retry(&self, id: Uuid) -> Result<Job>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>>;

    /// Jobs of a queue, oldest first, optionally filtered by status
    async fn list(&self, queue: &str, status: Option<JobStatus>) -> Result<Vec<Job>>;

    async fn logs(&self, id: Uuid) -> Result<Vec<LogEntry>>;

    async fn counts(&self, queue: &str) -> Result<JobCounts>;
}

/// Handle to one named queue
///
/// Carries the delivery options applied to every job it adds.
#[derive(Clone)]
pub struct Queue {
    name: String,
    options: JobOptions,
    backend: Arc<dyn JobQueue>,
}

impl Queue {
    pub fn new(name: impl Into<String>, backend: Arc<dyn JobQueue>) -> Self {
        Self {
            name: name.into(),
            options: JobOptions::default(),
            backend,
        }
    }

    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> JobOptions {
        self.options
    }

    pub fn backend(&self) -> &Arc<dyn JobQueue> {
        &self.backend
    }

    /// Enqueue a payload with this queue's options
    pub async fn add(&self, payload: serde_json::Value) -> Result<Job> {
        let job = self
            .backend
            .enqueue(&self.name, payload, self.options)
            .await?;
        tracing::debug!(queue = %self.name, job_id = %job.id, seq = job.seq, "Job enqueued");
        Ok(job)
    }

    pub async fn claim(&self, worker_id: &str) -> Result<Option<Job>> {
        self.backend.claim_next(&self.name, worker_id).await
    }

    pub async fn requeue_stalled(
        &self,
        started_before: DateTime<Utc>,
        max_stalled: u32,
    ) -> Result<StalledJobs> {
        self.backend
            .requeue_stalled(&self.name, started_before, max_stalled)
            .await
    }

    pub async fn list(&self, status: Option<JobStatus>) -> Result<Vec<Job>> {
        self.backend.list(&self.name, status).await
    }

    pub async fn counts(&self) -> Result<JobCounts> {
        self.backend.counts(&self.name).await
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
