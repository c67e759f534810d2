//! Motormart API
//!
//! HTTP server for order submission and the operator queue dashboard.
//! Submissions are validated and persisted synchronously; confirmation is
//! enqueued on the order queue and handled by `motormart-worker`.

use std::sync::Arc;

use anyhow::Context;
use motormart_store::{PgJobQueue, PgStore, Queue, db};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::config::Config;
use crate::service::{JobService, OrderService};

pub mod api;
pub mod config;
pub mod service;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "motormart_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Motormart API...");

    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Connecting to database...");

    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Database connection pool created");

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let store = Arc::new(PgStore::new(pool.clone()));
    let backend = Arc::new(PgJobQueue::new(pool));
    let queue = Queue::new(config.order_queue.clone(), backend.clone())
        .with_options(config.job_options);

    tracing::info!(
        "Order queue: {} (max attempts: {}, backoff: {:?})",
        queue.name(),
        config.job_options.max_attempts,
        config.job_options.backoff
    );

    let state = AppState {
        orders: Arc::new(OrderService::new(
            store.clone(),
            store.clone(),
            store,
            queue,
        )),
        jobs: Arc::new(JobService::new(backend)),
    };

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Motormart API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
