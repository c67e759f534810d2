//! API Module
//!
//! HTTP API layer for orders and the operator queue dashboard.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod job;
pub mod order;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::service::{JobService, OrderService};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub jobs: Arc<JobService>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Order endpoints
        .route("/order", get(order::list_orders))
        .route("/order/{id}", get(order::get_order).post(order::submit_order))
        // Queue dashboard endpoints
        .route("/queue/{name}/jobs", get(job::list_jobs))
        .route("/queue/{name}/counts", get(job::queue_counts))
        .route("/job/{id}", get(job::get_job))
        .route("/job/{id}/logs", get(job::get_job_logs))
        .route("/job/{id}/retry", post(job::retry_job))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
