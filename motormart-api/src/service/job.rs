//! Job Service
//!
//! Read and retry operations over queued jobs for operators.

use std::sync::Arc;

use motormart_core::domain::job::{Job, JobCounts, JobStatus};
use motormart_core::domain::log::LogEntry;
use motormart_store::{JobQueue, StoreError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    InvalidState(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidState(msg) => JobError::InvalidState(msg),
            other => JobError::Store(other),
        }
    }
}

pub struct JobService {
    queue: Arc<dyn JobQueue>,
}

impl JobService {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self { queue }
    }

    pub async fn list(&self, queue: &str, status: Option<JobStatus>) -> Result<Vec<Job>, JobError> {
        Ok(self.queue.list(queue, status).await?)
    }

    pub async fn counts(&self, queue: &str) -> Result<JobCounts, JobError> {
        Ok(self.queue.counts(queue).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Job, JobError> {
        self.queue
            .find_by_id(id)
            .await?
            .ok_or(JobError::NotFound(id))
    }

    pub async fn logs(&self, id: Uuid) -> Result<Vec<LogEntry>, JobError> {
        // 404 for unknown jobs rather than an empty list
        self.get(id).await?;
        Ok(self.queue.logs(id).await?)
    }

    /// Resubmit a failed job
    pub async fn retry(&self, id: Uuid) -> Result<Job, JobError> {
        let job = self.queue.retry(id).await.map_err(|e| match e {
            StoreError::NotFound(_) => JobError::NotFound(id),
            other => JobError::from(other),
        })?;

        tracing::info!("Job {} resubmitted to queue {}", job.id, job.queue);
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motormart_core::domain::job::JobOptions;
    use motormart_core::domain::log::LogLevel;
    use motormart_store::MemoryJobQueue;

    async fn failed_job(queue: &MemoryJobQueue) -> Job {
        let job = queue
            .enqueue("orderQueue", serde_json::json!("x"), JobOptions::default())
            .await
            .unwrap();
        queue.claim_next("orderQueue", "w1").await.unwrap();
        queue.fail(job.id, "boom", None).await.unwrap()
    }

    #[tokio::test]
    async fn test_retry_failed_job() {
        let queue = MemoryJobQueue::new();
        let service = JobService::new(Arc::new(queue.clone()));
        let job = failed_job(&queue).await;
        assert_eq!(job.status, JobStatus::Failed);

        let retried = service.retry(job.id).await.unwrap();
        assert_eq!(retried.status, JobStatus::Waiting);

        assert!(matches!(
            service.retry(job.id).await,
            Err(JobError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let service = JobService::new(Arc::new(MemoryJobQueue::new()));
        let id = Uuid::new_v4();

        assert!(matches!(service.get(id).await, Err(JobError::NotFound(_))));
        assert!(matches!(service.logs(id).await, Err(JobError::NotFound(_))));
        assert!(matches!(service.retry(id).await, Err(JobError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_logs_and_counts() {
        let queue = MemoryJobQueue::new();
        let service = JobService::new(Arc::new(queue.clone()));
        let job = failed_job(&queue).await;
        queue
            .append_logs(job.id, vec![LogEntry::new(LogLevel::Error, "Transaction Error!")])
            .await
            .unwrap();

        let logs = service.logs(job.id).await.unwrap();
        assert_eq!(logs[0].message, "Transaction Error!");

        let counts = service.counts("orderQueue").await.unwrap();
        assert_eq!(counts.failed, 1);
        assert_eq!(
            service
                .list("orderQueue", Some(JobStatus::Failed))
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
