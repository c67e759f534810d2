//! Job command handlers
//!
//! Handles all job-related CLI commands including listing,
//! viewing details, accessing logs and retrying failed jobs.

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use colored::*;
use motormart_core::domain::job::{Job, JobStatus};
use motormart_core::domain::log::{LogEntry, LogLevel};
use motormart_core::dto::job::JobSummary;

use super::DEFAULT_QUEUE;
use crate::api::ApiClient;
use crate::config::Config;
use crate::id_resolver::resolve_job_id;
use crate::types::IdOrPrefix;

/// Job status filter
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Waiting,
    Active,
    Completed,
    Failed,
}

impl From<StatusArg> for JobStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Waiting => JobStatus::Waiting,
            StatusArg::Active => JobStatus::Active,
            StatusArg::Completed => JobStatus::Completed,
            StatusArg::Failed => JobStatus::Failed,
        }
    }
}

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// List jobs of a queue
    List {
        #[arg(long, default_value = DEFAULT_QUEUE)]
        queue: String,

        /// Only jobs in this state
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Get job details
    Get {
        /// Job ID or unambiguous prefix
        id: String,

        #[arg(long, default_value = DEFAULT_QUEUE)]
        queue: String,
    },
    /// Get job logs
    Logs {
        /// Job ID or unambiguous prefix
        id: String,

        #[arg(long, default_value = DEFAULT_QUEUE)]
        queue: String,
    },
    /// Resubmit a failed job
    Retry {
        /// Job ID or unambiguous prefix
        id: String,

        #[arg(long, default_value = DEFAULT_QUEUE)]
        queue: String,
    },
}

/// Handle job commands
///
/// Routes job subcommands to their respective handlers.
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.api_url);

    match command {
        JobCommands::List { queue, status } => {
            list_jobs(&client, &queue, status.map(JobStatus::from)).await
        }
        JobCommands::Get { id, queue } => get_job(&client, &queue, &id).await,
        JobCommands::Logs { id, queue } => get_job_logs(&client, &queue, &id).await,
        JobCommands::Retry { id, queue } => retry_job(&client, &queue, &id).await,
    }
}

async fn list_jobs(client: &ApiClient, queue: &str, status: Option<JobStatus>) -> Result<()> {
    let jobs = client.list_jobs(queue, status).await?;

    if jobs.is_empty() {
        println!("{}", format!("No jobs found in {}.", queue).yellow());
    } else {
        println!("{}", format!("Found {} job(s) in {}:", jobs.len(), queue).bold());
        println!();
        for job in &jobs {
            print_job_summary(job);
        }
    }

    Ok(())
}

/// Get and display a single job
async fn get_job(client: &ApiClient, queue: &str, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, queue, &IdOrPrefix::parse(id)).await?;
    let job = client.get_job(uuid).await?;

    print_job_details(&job);

    Ok(())
}

/// Get and display job logs
async fn get_job_logs(client: &ApiClient, queue: &str, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, queue, &IdOrPrefix::parse(id)).await?;
    let logs = client.get_job_logs(uuid).await?;

    if logs.is_empty() {
        println!("{}", "No logs found for this job.".yellow());
    } else {
        println!("{}", format!("Logs for job {}:", uuid).bold());
        println!("{}", "─".repeat(80).dimmed());
        for log in &logs {
            print_log_entry(log);
        }
        println!("{}", "─".repeat(80).dimmed());
    }

    Ok(())
}

async fn retry_job(client: &ApiClient, queue: &str, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, queue, &IdOrPrefix::parse(id)).await?;
    let job = client.retry_job(uuid).await?;

    println!(
        "{} Job {} is {} again",
        "✓".green(),
        job.id.to_string().cyan(),
        colorize_status(job.status)
    );

    Ok(())
}

fn print_job_summary(job: &JobSummary) {
    println!("  {} Job {} (#{})", "▸".cyan(), job.id.to_string().dimmed(), job.seq);
    println!("    Status:   {}", colorize_status(job.status));
    println!("    Progress: {}%", job.progress);
    println!("    Attempts: {}", job.attempts_made);
    println!(
        "    Enqueued: {}",
        job.enqueued_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed job information
fn print_job_details(job: &Job) {
    println!("{}", "Job Details:".bold());
    println!("  ID:        {}", job.id.to_string().cyan());
    println!("  Queue:     {} (#{})", job.queue, job.seq);
    println!("  Status:    {}", colorize_status(job.status));
    println!("  Progress:  {}%", job.progress);
    println!("  Attempts:  {}/{}", job.attempts_made, job.max_attempts);
    if job.stalled_count > 0 {
        println!("  Stalled:   {} time(s)", job.stalled_count.to_string().yellow());
    }
    println!("  Payload:   {}", job.payload);
    println!("  Enqueued:  {}", job.enqueued_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(started) = job.started_at {
        println!("  Started:   {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(finished) = job.finished_at {
        println!("  Finished:  {}", finished.format("%Y-%m-%d %H:%M:%S"));

        if let Some(started) = job.started_at {
            let duration = finished.signed_duration_since(started);
            println!("  Duration:  {}ms", duration.num_milliseconds());
        }
    }

    if let Some(worker) = &job.worker_id {
        println!("  Worker:    {}", worker);
    }

    if let Some(result) = &job.result {
        println!("\n{}", "Result:".bold());
        let status = result.status.to_string();
        let status = if result.is_success() {
            status.green()
        } else if result.is_client_error() {
            status.yellow()
        } else {
            status.red()
        };
        println!("  Status:    {}", status);
        println!("  Message:   {}", result.message);

        if let Some(data) = &result.data {
            if let Ok(pretty) = serde_json::to_string_pretty(data) {
                println!("\n{}", "Data:".bold());
                println!("{}", pretty);
            }
        }
    }

    if let Some(reason) = &job.failed_reason {
        println!("\n{}", "Failure:".bold());
        println!("{}", reason.red());
    }
}

/// Print a log entry
fn print_log_entry(log: &LogEntry) {
    let level_str = log.level.as_str().to_uppercase();
    let level_colored = match log.level {
        LogLevel::Debug => level_str.dimmed(),
        LogLevel::Info => level_str.cyan(),
        LogLevel::Warning => level_str.yellow(),
        LogLevel::Error => level_str.red(),
    };

    println!(
        "{} [{}] {}",
        log.timestamp.format("%H:%M:%S").to_string().dimmed(),
        level_colored,
        log.message
    );
}

/// Colorize job status for display
fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Waiting => status_str.yellow(),
        JobStatus::Active => status_str.cyan(),
        JobStatus::Completed => status_str.green(),
        JobStatus::Failed => status_str.red(),
    }
}
