//! Job API Handlers
//!
//! Operator endpoints for inspecting queues and resubmitting failed jobs.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use motormart_core::domain::job::{Job, JobCounts};
use motormart_core::domain::log::LogEntry;
use motormart_core::dto::job::{JobListQuery, JobSummary};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::ApiResult;

/// GET /queue/{name}/jobs
/// List jobs of a queue, optionally filtered by `status`
pub async fn list_jobs(
    State(state): State<AppState>,
    Path(queue): Path<String>,
    Query(params): Query<JobListQuery>,
) -> ApiResult<Json<Vec<JobSummary>>> {
    tracing::debug!("Listing jobs of queue {} (status: {:?})", queue, params.status);

    let jobs = state.jobs.list(&queue, params.status).await?;
    Ok(Json(jobs.iter().map(JobSummary::from).collect()))
}

/// GET /queue/{name}/counts
/// Number of jobs per state
pub async fn queue_counts(
    State(state): State<AppState>,
    Path(queue): Path<String>,
) -> ApiResult<Json<JobCounts>> {
    tracing::debug!("Counting jobs of queue {}", queue);
    Ok(Json(state.jobs.counts(&queue).await?))
}

/// GET /job/{id}
/// Get job details by ID
pub async fn get_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);
    Ok(Json(state.jobs.get(id).await?))
}

/// GET /job/{id}/logs
/// Get all logs recorded by a job
pub async fn get_job_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<LogEntry>>> {
    tracing::debug!("Getting logs for job: {}", id);
    Ok(Json(state.jobs.logs(id).await?))
}

/// POST /job/{id}/retry
/// Put a failed job back in its queue
pub async fn retry_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Job>> {
    tracing::info!("Retrying job: {}", id);
    Ok(Json(state.jobs.retry(id).await?))
}
