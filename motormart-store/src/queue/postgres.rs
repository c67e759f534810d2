//! Postgres Job Queue
//!
//! Jobs live in the `jobs` table ordered by `seq`. Claims lock the oldest
//! waiting row with `FOR UPDATE SKIP LOCKED`, so concurrent workers never
//! receive the same delivery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use motormart_core::domain::job::{Backoff, Job, JobCounts, JobOptions, JobStatus};
use motormart_core::domain::log::{LogEntry, LogLevel};
use motormart_core::outcome::Reply;
use sqlx::PgPool;
use uuid::Uuid;

use super::{JobQueue, STALLED_REASON, StalledJobs};
use crate::error::{Result, StoreError};

macro_rules! job_columns {
    () => {
        "id, queue, seq, payload, status, progress, attempts_made, max_attempts, \
         backoff_kind, backoff_ms, stalled_count, enqueued_at, available_at, started_at, finished_at, \
         worker_id, result, failed_reason"
    };
}

#[derive(Debug, Clone)]
pub struct PgJobQueue {
    pool: PgPool,
}

impl PgJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Distinguishes a missing job from one in the wrong state after a guarded update
    async fn state_error(&self, id: Uuid, operation: &str) -> StoreError {
        match self.find_by_id(id).await {
            Ok(Some(job)) => StoreError::InvalidState(format!(
                "cannot {} job {} in status {}",
                operation, id, job.status
            )),
            Ok(None) => StoreError::NotFound(format!("job {}", id)),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(
        &self,
        queue: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Result<Job> {
        let now = Utc::now();

        let row = sqlx::query_as::<_, JobRow>(concat!(
            r#"
            INSERT INTO jobs (id, queue, payload, status, max_attempts, backoff_kind,
                              backoff_ms, enqueued_at, available_at)
            VALUES ($1, $2, $3, 'Waiting', $4, $5, $6, $7, $7)
            RETURNING "#,
            job_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(queue)
        .bind(payload)
        .bind(options.max_attempts as i32)
        .bind(options.backoff.kind())
        .bind(options.backoff.delay_ms() as i64)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Job::try_from(row)
    }

    async fn claim_next(&self, queue: &str, worker_id: &str) -> Result<Option<Job>> {
        let now = Utc::now();

        let row = sqlx::query_as::<_, JobRow>(concat!(
            r#"
            UPDATE jobs
            SET status = 'Active', started_at = $3, worker_id = $2,
                attempts_made = attempts_made + 1
            WHERE id = (
                SELECT id FROM jobs
                WHERE queue = $1 AND status = 'Waiting' AND available_at <= $3
                ORDER BY seq ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING "#,
            job_columns!()
        ))
        .bind(queue)
        .bind(worker_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Job::try_from).transpose()
    }

    async fn update_progress(&self, id: Uuid, progress: u8) -> Result<()> {
        sqlx::query("UPDATE jobs SET progress = GREATEST(progress, $1) WHERE id = $2")
            .bind(i16::from(progress.min(100)))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn append_logs(&self, id: Uuid, entries: Vec<LogEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO job_logs (job_id, timestamp, level, message)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(id)
            .bind(entry.timestamp)
            .bind(entry.level.as_str())
            .bind(&entry.message)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn complete(&self, id: Uuid, result: Reply) -> Result<Job> {
        let row = sqlx::query_as::<_, JobRow>(concat!(
            r#"
            UPDATE jobs
            SET status = 'Completed', progress = 100, finished_at = $2, result = $3
            WHERE id = $1 AND status IN ('Active', 'Waiting')
            RETURNING "#,
            job_columns!()
        ))
        .bind(id)
        .bind(Utc::now())
        .bind(serde_json::to_value(&result)?)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Job::try_from(row),
            None => Err(self.state_error(id, "complete").await),
        }
    }

    async fn fail(&self, id: Uuid, reason: &str, result: Option<Reply>) -> Result<Job> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, JobRow>(concat!(
            "SELECT ",
            job_columns!(),
            " FROM jobs WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let job = match row {
            Some(row) => Job::try_from(row)?,
            None => return Err(StoreError::NotFound(format!("job {}", id))),
        };
        if job.status.is_terminal() {
            return Err(StoreError::InvalidState(format!(
                "cannot fail job {} in status {}",
                id, job.status
            )));
        }

        let now = Utc::now();
        let result = result.map(|r| serde_json::to_value(&r)).transpose()?;

        let row = match job.retry_at(now) {
            Some(available_at) => {
                sqlx::query_as::<_, JobRow>(concat!(
                    r#"
                    UPDATE jobs
                    SET status = 'Waiting', available_at = $2, started_at = NULL,
                        worker_id = NULL, failed_reason = $3, result = $4
                    WHERE id = $1
                    RETURNING "#,
                    job_columns!()
                ))
                .bind(id)
                .bind(available_at)
                .bind(reason)
                .bind(result)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, JobRow>(concat!(
                    r#"
                    UPDATE jobs
                    SET status = 'Failed', finished_at = $2, failed_reason = $3, result = $4
                    WHERE id = $1
                    RETURNING "#,
                    job_columns!()
                ))
                .bind(id)
                .bind(now)
                .bind(reason)
                .bind(result)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Job::try_from(row)
    }

    async fn requeue_stalled(
        &self,
        queue: &str,
        started_before: DateTime<Utc>,
        max_stalled: u32,
    ) -> Result<StalledJobs> {
        let now = Utc::now();
        let max_stalled = i32::try_from(max_stalled).unwrap_or(i32::MAX);
        let mut tx = self.pool.begin().await?;

        let failed = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'Failed', finished_at = $3, failed_reason = $5
            WHERE queue = $1 AND status = 'Active' AND started_at < $2
              AND stalled_count >= $4
            "#,
        )
        .bind(queue)
        .bind(started_before)
        .bind(now)
        .bind(max_stalled)
        .bind(STALLED_REASON)
        .execute(&mut *tx)
        .await?;

        let requeued = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'Waiting', stalled_count = stalled_count + 1,
                started_at = NULL, worker_id = NULL, available_at = $3
            WHERE queue = $1 AND status = 'Active' AND started_at < $2
              AND stalled_count < $4
            "#,
        )
        .bind(queue)
        .bind(started_before)
        .bind(now)
        .bind(max_stalled)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(StalledJobs {
            requeued: requeued.rows_affected(),
            failed: failed.rows_affected(),
        })
    }

    async fn retry(&self, id: Uuid) -> Result<Job> {
        let row = sqlx::query_as::<_, JobRow>(concat!(
            r#"
            UPDATE jobs
            SET status = 'Waiting', attempts_made = 0, stalled_count = 0, progress = 0,
                available_at = $2,
                started_at = NULL, finished_at = NULL, worker_id = NULL,
                result = NULL, failed_reason = NULL
            WHERE id = $1 AND status = 'Failed'
            RETURNING "#,
            job_columns!()
        ))
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Job::try_from(row),
            None => Err(self.state_error(id, "retry").await),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(concat!(
            "SELECT ",
            job_columns!(),
            " FROM jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Job::try_from).transpose()
    }

    async fn list(&self, queue: &str, status: Option<JobStatus>) -> Result<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(concat!(
            "SELECT ",
            job_columns!(),
            r#"
            FROM jobs
            WHERE queue = $1 AND ($2::VARCHAR IS NULL OR status = $2)
            ORDER BY seq ASC
            "#
        ))
        .bind(queue)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Job::try_from).collect()
    }

    async fn logs(&self, id: Uuid) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT timestamp, level, message
            FROM job_logs
            WHERE job_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LogEntry::from).collect())
    }

    async fn counts(&self, queue: &str) -> Result<JobCounts> {
        let rows: Vec<(String, bool, i64)> = sqlx::query_as(
            r#"
            SELECT status, (status = 'Waiting' AND available_at > $2) AS delayed, COUNT(*)
            FROM jobs
            WHERE queue = $1
            GROUP BY 1, 2
            "#,
        )
        .bind(queue)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await?;

        let mut counts = JobCounts::default();
        for (status, delayed, count) in rows {
            let count = count as u64;
            match status.parse::<JobStatus>().map_err(StoreError::Corrupt)? {
                JobStatus::Waiting if delayed => counts.delayed += count,
                JobStatus::Waiting => counts.waiting += count,
                JobStatus::Active => counts.active += count,
                JobStatus::Completed => counts.completed += count,
                JobStatus::Failed => counts.failed += count,
            }
        }

        Ok(counts)
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    queue: String,
    seq: i64,
    payload: serde_json::Value,
    status: String,
    progress: i16,
    attempts_made: i32,
    max_attempts: i32,
    backoff_kind: String,
    backoff_ms: i64,
    stalled_count: i32,
    enqueued_at: DateTime<Utc>,
    available_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    worker_id: Option<String>,
    result: Option<serde_json::Value>,
    failed_reason: Option<String>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self> {
        let status = row.status.parse::<JobStatus>().map_err(StoreError::Corrupt)?;
        let result = row
            .result
            .map(serde_json::from_value::<Reply>)
            .transpose()?;

        Ok(Job {
            id: row.id,
            queue: row.queue,
            seq: row.seq,
            payload: row.payload,
            status,
            progress: row.progress.clamp(0, 100) as u8,
            attempts_made: row.attempts_made.max(0) as u32,
            max_attempts: row.max_attempts.max(0) as u32,
            backoff: Backoff::from_parts(&row.backoff_kind, row.backoff_ms.max(0) as u64),
            stalled_count: row.stalled_count.max(0) as u32,
            enqueued_at: row.enqueued_at,
            available_at: row.available_at,
            started_at: row.started_at,
            finished_at: row.finished_at,
            worker_id: row.worker_id,
            result,
            failed_reason: row.failed_reason,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    timestamp: DateTime<Utc>,
    level: String,
    message: String,
}

impl From<LogRow> for LogEntry {
    fn from(row: LogRow) -> Self {
        LogEntry {
            timestamp: row.timestamp,
            level: LogLevel::parse_lossy(&row.level),
            message: row.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, result: Option<serde_json::Value>) -> JobRow {
        let now = Utc::now();
        JobRow {
            id: Uuid::new_v4(),
            queue: "orderQueue".to_string(),
            seq: 7,
            payload: serde_json::json!("3f1c2b9e-0000-4000-8000-000000000000"),
            status: status.to_string(),
            progress: 50,
            attempts_made: 1,
            max_attempts: 3,
            backoff_kind: "exponential".to_string(),
            backoff_ms: 500,
            stalled_count: 0,
            enqueued_at: now,
            available_at: now,
            started_at: Some(now),
            finished_at: None,
            worker_id: Some("worker-1".to_string()),
            result,
            failed_reason: None,
        }
    }

    #[test]
    fn test_job_row_decodes_backoff_and_result() {
        let job = Job::try_from(row(
            "Completed",
            Some(serde_json::json!({ "status": 201, "message": "Order created successfully!" })),
        ))
        .unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.backoff, Backoff::Exponential { delay_ms: 500 });
        assert_eq!(job.result.unwrap().status, 201);
    }

    #[test]
    fn test_job_row_with_unknown_status_is_corrupt() {
        assert!(matches!(
            Job::try_from(row("Paused", None)),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_unknown_log_level_reads_as_info() {
        let entry = LogEntry::from(LogRow {
            timestamp: Utc::now(),
            level: "Trace".to_string(),
            message: "hello".to_string(),
        });
        assert_eq!(entry.level, LogLevel::Info);
    }
}
