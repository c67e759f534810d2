//! Motormart Worker
//!
//! A stateless process that confirms submitted orders.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Services: Job handlers (order confirmation)
//! - Scheduler: Job polling, log streaming and stall recovery
//!
//! The worker claims jobs from the order queue, runs the confirmation handler
//! on each, and reports the outcome back to the queue. Several workers may
//! consume the same queue.

mod config;
mod context;
mod scheduler;
mod service;

use anyhow::{Context, Result};
use motormart_store::{PgJobQueue, PgStore, Queue, db};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::scheduler::JobPoller;
use crate::service::{JobHandler, OrderConfirmation};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "motormart_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Motormart Worker");

    // Load configuration
    let config = load_config()?;
    info!(
        "Loaded configuration: worker_id={}, queue={}",
        config.worker_id, config.order_queue
    );

    // Connect to the database (with retry logic)
    let pool = connect_with_retry(&config.database_url).await?;
    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database ready");

    let queue = Queue::new(
        config.order_queue.clone(),
        Arc::new(PgJobQueue::new(pool.clone())),
    );
    let handler: Arc<dyn JobHandler> =
        Arc::new(OrderConfirmation::new(Arc::new(PgStore::new(pool))));

    // Create job poller
    let poller = JobPoller::new(config.clone(), queue, handler);

    info!(
        "Poll interval: {:?}, Log flush interval: {:?}, Stall timeout: {:?}",
        config.poll_interval, config.log_flush_interval, config.stall_timeout
    );

    // Start polling loop
    if let Err(e) = poller.run(shutdown_signal()).await {
        error!("Poller error: {}", e);
        return Err(e);
    }

    info!("Motormart Worker stopped");
    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(e) => {
            info!("Failed to load config from environment ({}), using defaults", e);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Connect to the database with retry logic and exponential backoff
///
/// This handles the case where the database may not be ready yet when
/// the worker starts (common in container environments).
async fn connect_with_retry(database_url: &str) -> Result<PgPool> {
    const MAX_RETRIES: u32 = 10;
    const INITIAL_DELAY_MS: u64 = 500;
    const MAX_DELAY_MS: u64 = 30_000;

    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;

    loop {
        attempt += 1;

        match db::create_pool(database_url).await {
            Ok(pool) => {
                if attempt > 1 {
                    info!("Connected to database after {} attempt(s)", attempt);
                }
                return Ok(pool);
            }
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    error!("Failed to connect to database after {} attempts", MAX_RETRIES);
                    return Err(anyhow::anyhow!("Failed to connect to database: {}", e));
                }

                warn!(
                    "Failed to connect to database (attempt {}/{}): {}",
                    attempt, MAX_RETRIES, e
                );
                warn!("Retrying in {} ms...", delay_ms);

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                // Exponential backoff with cap
                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
        }
    }
}
