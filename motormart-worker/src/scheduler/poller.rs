//! Job poller
//!
//! Claims jobs from one queue and runs the registered handler on each.
//! Every job runs in its own task with a context buffering logs and progress.
//! A handler panic or error fails that job only; the poller keeps going.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use motormart_core::domain::job::Job;
use motormart_core::outcome::Reply;
use motormart_store::{JobQueue, Queue};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio::task::JoinError;
use tokio::time::{self, Duration};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::context::JobContext;
use crate::service::JobHandler;

/// Final state a delivery attempt reports to the queue
#[derive(Debug, Clone, PartialEq)]
enum Disposition {
    Completed(Reply),
    Failed {
        reason: String,
        reply: Option<Reply>,
    },
}

/// Job poller that continuously claims and executes jobs
pub struct JobPoller {
    config: Config,
    queue: Queue,
    handler: Arc<dyn JobHandler>,
    semaphore: Arc<Semaphore>,
}

impl JobPoller {
    /// Creates a new job poller bound to one queue and one handler
    pub fn new(config: Config, queue: Queue, handler: Arc<dyn JobHandler>) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.concurrency));
        Self {
            config,
            queue,
            handler,
            semaphore,
        }
    }

    /// Runs the polling loop until `shutdown` resolves
    ///
    /// The cycle in progress when shutdown is requested runs to completion.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        info!(
            "Starting job poller on queue {} (interval: {:?}, concurrency: {})",
            self.queue.name(),
            self.config.poll_interval,
            self.config.concurrency
        );

        let stall_check = self.start_stall_check_loop();
        let mut interval = time::interval(self.config.poll_interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping job poller");
                    break;
                }
                _ = interval.tick() => {
                    debug!("Polling for waiting jobs");

                    match self.poll_and_execute_once().await {
                        Ok(executed) => {
                            if executed > 0 {
                                info!("Executed {} job(s) this cycle", executed);
                            }
                        }
                        Err(e) => {
                            error!("Error during poll cycle: {:#}", e);
                        }
                    }
                }
            }
        }

        stall_check.abort();
        Ok(())
    }

    /// Performs a single poll cycle
    ///
    /// Claims jobs in FIFO order while permits are available and waits for
    /// all of them to finish.
    pub async fn poll_and_execute_once(&self) -> Result<usize> {
        let mut handles = Vec::new();
        let mut claim_error = None;

        // Try to acquire semaphore permit, stop claiming if at max capacity
        while let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            match self.queue.claim(&self.config.worker_id).await {
                Ok(Some(job)) => {
                    info!(
                        "Claimed job {} (seq {}, attempt {}/{})",
                        job.id, job.seq, job.attempts_made, job.max_attempts
                    );
                    handles.push(self.spawn_job_task(job, permit));
                }
                Ok(None) => break,
                Err(e) => {
                    claim_error = Some(e);
                    break;
                }
            }
        }

        let num_jobs = handles.len();
        if num_jobs == 0 && claim_error.is_none() {
            debug!("No jobs available");
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Job task panicked: {}", e);
            }
        }

        match claim_error {
            Some(e) => Err(anyhow::Error::new(e).context("Failed to claim job")),
            None => Ok(num_jobs),
        }
    }

    /// Spawns a task to execute a single job
    fn spawn_job_task(&self, job: Job, permit: OwnedSemaphorePermit) -> tokio::task::JoinHandle<()> {
        let backend = Arc::clone(self.queue.backend());
        let handler = Arc::clone(&self.handler);
        let flush_interval = self.config.log_flush_interval;

        tokio::spawn(async move {
            let job_id = job.id;
            if let Err(e) = Self::execute_job(job, backend, handler, flush_interval).await {
                error!("Failed to report job {}: {:#}", job_id, e);
            }
            // Permit is released when dropped
            drop(permit);
        })
    }

    /// Executes a single job with log streaming
    async fn execute_job(
        job: Job,
        backend: Arc<dyn JobQueue>,
        handler: Arc<dyn JobHandler>,
        flush_interval: Duration,
    ) -> Result<()> {
        let job_id = job.id;
        let context = JobContext::new(&job);

        let (stop_flusher, stop) = watch::channel(false);
        let flusher = Self::spawn_log_sender(
            Arc::clone(&context),
            Arc::clone(&backend),
            flush_interval,
            stop,
        );

        // The handler runs in its own task so a panic surfaces as a JoinError
        let outcome = tokio::spawn({
            let context = Arc::clone(&context);
            async move { handler.handle(context).await }
        })
        .await;

        // Stop the log sender between flushes, then send what is left
        stop_flusher.send_replace(true);
        if let Err(e) = flusher.await {
            warn!("Log sender for job {} failed: {}", job_id, e);
        }
        Self::flush(&context, backend.as_ref()).await;

        match classify(outcome) {
            Disposition::Completed(reply) => {
                if reply.is_client_error() {
                    warn!(
                        "Job {} completed with status {}: {}",
                        job_id, reply.status, reply.message
                    );
                } else {
                    info!("Job {} completed with status {}", job_id, reply.status);
                }
                backend.complete(job_id, reply).await?;
            }
            Disposition::Failed { reason, reply } => {
                error!("Job {} failed: {}", job_id, reason);
                let job = backend.fail(job_id, &reason, reply).await?;
                if !job.status.is_terminal() {
                    info!(
                        "Job {} will be retried at {} (attempt {}/{})",
                        job_id, job.available_at, job.attempts_made, job.max_attempts
                    );
                }
            }
        }

        Ok(())
    }

    /// Writes buffered logs and any progress change to the queue
    async fn flush(context: &JobContext, backend: &dyn JobQueue) {
        let job_id = context.job_id();

        let logs = context.drain_logs();
        if !logs.is_empty() {
            debug!("Sending {} logs for job {}", logs.len(), job_id);
            if let Err(e) = backend.append_logs(job_id, logs).await {
                error!("Failed to send logs for job {}: {}", job_id, e);
            }
        }

        if let Some(progress) = context.take_progress_update() {
            if let Err(e) = backend.update_progress(job_id, progress).await {
                error!("Failed to update progress for job {}: {}", job_id, e);
            }
        }
    }

    /// Spawns a background task to send logs periodically
    ///
    /// A flush in progress always completes; `stop` is only observed between ticks.
    fn spawn_log_sender(
        context: Arc<JobContext>,
        backend: Arc<dyn JobQueue>,
        interval: Duration,
        mut stop: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);

            loop {
                tokio::select! {
                    biased;
                    _ = stop.changed() => break,
                    _ = ticker.tick() => Self::flush(&context, backend.as_ref()).await,
                }
            }
        })
    }

    /// Starts a background task that redelivers jobs abandoned by crashed workers
    fn start_stall_check_loop(&self) -> tokio::task::JoinHandle<()> {
        let queue = self.queue.clone();
        let stall_timeout = self.config.stall_timeout;
        let check_interval = self.config.stall_check_interval;
        let max_stalled = self.config.max_stalled_count;

        tokio::spawn(async move {
            let mut ticker = time::interval(check_interval);

            loop {
                ticker.tick().await;

                let timeout = chrono::Duration::from_std(stall_timeout)
                    .unwrap_or_else(|_| chrono::Duration::days(365));
                let cutoff = Utc::now() - timeout;

                match queue.requeue_stalled(cutoff, max_stalled).await {
                    Ok(swept) if swept.is_empty() => debug!("No stalled jobs"),
                    Ok(swept) => warn!(
                        "Stalled jobs on {}: {} requeued, {} failed",
                        queue.name(),
                        swept.requeued,
                        swept.failed
                    ),
                    Err(e) => warn!("Failed to check for stalled jobs: {}", e),
                }
            }
        })
    }
}

/// Maps a handler outcome to the job's final state
fn classify(outcome: std::result::Result<Result<Reply>, JoinError>) -> Disposition {
    match outcome {
        Ok(Ok(reply)) if reply.is_success() || reply.is_client_error() => {
            Disposition::Completed(reply)
        }
        Ok(Ok(reply)) => {
            let reason = match &reply.data {
                Some(serde_json::Value::String(detail)) => {
                    format!("{}: {}", reply.message, detail)
                }
                _ => reply.message.clone(),
            };
            Disposition::Failed {
                reason,
                reply: Some(reply),
            }
        }
        Ok(Err(e)) => Disposition::Failed {
            reason: format!("{:#}", e),
            reply: None,
        },
        Err(e) if e.is_panic() => Disposition::Failed {
            reason: format!("handler panicked: {}", panic_message(e)),
            reply: None,
        },
        Err(e) => Disposition::Failed {
            reason: format!("handler task failed: {}", e),
            reply: None,
        },
    }
}

fn panic_message(err: JoinError) -> String {
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
