//! Execution context for queued jobs
//!
//! Handed to a [`JobHandler`](crate::service::JobHandler) for one delivery
//! attempt. Holds the job payload and buffers the progress and log lines the
//! handler reports until the poller flushes them to the queue.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use motormart_core::domain::job::Job;
use motormart_core::domain::log::{LogEntry, LogLevel};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Execution context shared between a handler and the poller
pub struct JobContext {
    job_id: Uuid,

    /// Job payload as enqueued
    data: JsonValue,

    /// Highest progress reported so far
    progress: AtomicU8,

    /// Last progress value written to the queue
    flushed_progress: AtomicU8,

    /// Log buffer with entries
    log_buffer: Mutex<Vec<LogEntry>>,
}

impl JobContext {
    /// Creates a context for one delivery of `job`
    pub fn new(job: &Job) -> Arc<Self> {
        Arc::new(Self {
            job_id: job.id,
            data: job.payload.clone(),
            progress: AtomicU8::new(job.progress),
            flushed_progress: AtomicU8::new(job.progress),
            log_buffer: Mutex::new(Vec::new()),
        })
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn data(&self) -> &JsonValue {
        &self.data
    }

    /// Reports progress in percent; values below the current one are ignored
    pub fn progress(&self, percent: u8) {
        self.progress.fetch_max(percent.min(100), Ordering::SeqCst);
    }

    pub fn current_progress(&self) -> u8 {
        self.progress.load(Ordering::SeqCst)
    }

    /// Progress to write to the queue, if it moved since the last call
    pub fn take_progress_update(&self) -> Option<u8> {
        let current = self.current_progress();
        let previous = self.flushed_progress.swap(current, Ordering::SeqCst);
        (current > previous).then_some(current)
    }

    /// Adds a log entry to the buffer
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let mut buffer = self.log_buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.push(LogEntry::new(level, message));
    }

    pub fn log_info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn log_warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn log_error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Drains all log entries from the buffer
    pub fn drain_logs(&self) -> Vec<LogEntry> {
        let mut buffer = self.log_buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use motormart_core::domain::job::{Backoff, JobStatus};

    fn job() -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            queue: "orderQueue".to_string(),
            seq: 1,
            payload: serde_json::json!("abc"),
            status: JobStatus::Active,
            progress: 0,
            attempts_made: 1,
            max_attempts: 1,
            backoff: Backoff::Fixed { delay_ms: 0 },
            stalled_count: 0,
            enqueued_at: now,
            available_at: now,
            started_at: Some(now),
            finished_at: None,
            worker_id: None,
            result: None,
            failed_reason: None,
        }
    }

    #[test]
    fn test_progress_is_monotonic() {
        let ctx = JobContext::new(&job());
        ctx.progress(50);
        ctx.progress(25);
        assert_eq!(ctx.current_progress(), 50);
        ctx.progress(250);
        assert_eq!(ctx.current_progress(), 100);
    }

    #[test]
    fn test_progress_update_reported_once() {
        let ctx = JobContext::new(&job());
        assert_eq!(ctx.take_progress_update(), None);

        ctx.progress(10);
        assert_eq!(ctx.take_progress_update(), Some(10));
        assert_eq!(ctx.take_progress_update(), None);
    }

    #[test]
    fn test_drain_logs_empties_buffer() {
        let ctx = JobContext::new(&job());
        ctx.log_info("first");
        ctx.log_error("second");

        let logs = ctx.drain_logs();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1].level, LogLevel::Error);
        assert!(ctx.drain_logs().is_empty());
    }
}
