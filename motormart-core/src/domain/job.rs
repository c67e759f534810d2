//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::outcome::Reply;

/// A unit of deferred work
///
/// Structure shared between the API (enqueues), the worker (claims and
/// completes) and the operator surface (inspects and retries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub queue: String,
    /// Insertion order within the queue
    pub seq: i64,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub progress: u8,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Times the job was found abandoned by its worker and redelivered
    pub stalled_count: u32,
    pub enqueued_at: DateTime<Utc>,
    /// Earliest time the job may be claimed (later than `enqueued_at` while backing off)
    pub available_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub worker_id: Option<String>,
    pub result: Option<Reply>,
    pub failed_reason: Option<String>,
}

impl Job {
    /// When a failed attempt should be redelivered, or `None` once attempts are exhausted
    pub fn retry_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.attempts_made >= self.max_attempts {
            return None;
        }

        let delay = self.backoff.delay_for_attempt(self.attempts_made);
        let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        Some(now + delay)
    }

    /// Waiting but not yet claimable
    pub fn is_delayed(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Waiting && self.available_at > now
    }
}

/// Job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Waiting,
    Active,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Waiting => "Waiting",
            JobStatus::Active => "Active",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Waiting" => Ok(JobStatus::Waiting),
            "Active" => Ok(JobStatus::Active),
            "Completed" => Ok(JobStatus::Completed),
            "Failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

/// Delay between automatic retries of a failed job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay before every retry
    Fixed { delay_ms: u64 },
    /// `delay_ms * 2^(attempt - 1)`
    Exponential { delay_ms: u64 },
}

impl Backoff {
    /// Delay after the given (1-indexed) failed attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Backoff::Exponential { delay_ms } => {
                let exponent = attempt.saturating_sub(1).min(16);
                Duration::from_millis(delay_ms.saturating_mul(1u64 << exponent))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Backoff::Fixed { .. } => "fixed",
            Backoff::Exponential { .. } => "exponential",
        }
    }

    pub fn delay_ms(&self) -> u64 {
        match *self {
            Backoff::Fixed { delay_ms } | Backoff::Exponential { delay_ms } => delay_ms,
        }
    }

    /// Rebuilds a backoff from its stored kind and base delay
    pub fn from_parts(kind: &str, delay_ms: u64) -> Self {
        match kind {
            "exponential" => Backoff::Exponential { delay_ms },
            _ => Backoff::Fixed { delay_ms },
        }
    }
}

/// Delivery options applied to every job a queue client enqueues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Total delivery attempts, including the first one
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::Fixed { delay_ms: 1000 },
        }
    }
}

/// Number of jobs per state in one queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounts {
    pub waiting: u64,
    pub delayed: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(attempts_made: u32, max_attempts: u32, backoff: Backoff) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            queue: "orderQueue".to_string(),
            seq: 1,
            payload: serde_json::json!("order"),
            status: JobStatus::Active,
            progress: 0,
            attempts_made,
            max_attempts,
            backoff,
            stalled_count: 0,
            enqueued_at: now,
            available_at: now,
            started_at: Some(now),
            finished_at: None,
            worker_id: Some("worker-1".to_string()),
            result: None,
            failed_reason: None,
        }
    }

    #[test]
    fn test_exponential_backoff_doubles() {
        let backoff = Backoff::Exponential { delay_ms: 100 };
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for_attempt(4), Duration::from_millis(800));
    }

    #[test]
    fn test_fixed_backoff_is_constant() {
        let backoff = Backoff::Fixed { delay_ms: 250 };
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(250));
        assert_eq!(backoff.delay_for_attempt(7), Duration::from_millis(250));
    }

    #[test]
    fn test_default_options_never_retry() {
        let options = JobOptions::default();
        let job = job(1, options.max_attempts, options.backoff);
        assert!(job.retry_at(Utc::now()).is_none());
    }

    #[test]
    fn test_retry_at_applies_backoff() {
        let now = Utc::now();
        let job = job(2, 3, Backoff::Exponential { delay_ms: 1000 });
        assert_eq!(job.retry_at(now), Some(now + chrono::Duration::seconds(2)));
    }

    #[test]
    fn test_backoff_parts_round_trip() {
        let backoff = Backoff::Exponential { delay_ms: 42 };
        assert_eq!(Backoff::from_parts(backoff.kind(), backoff.delay_ms()), backoff);
        assert_eq!(
            Backoff::from_parts("fixed", 10),
            Backoff::Fixed { delay_ms: 10 }
        );
    }
}
