use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Products and carts are owned by the listing/cart surfaces; the order
    // pipeline only reads them.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id UUID PRIMARY KEY,
            owner_id UUID NOT NULL,
            name VARCHAR(255) NOT NULL,
            brand VARCHAR(255) NOT NULL,
            choice VARCHAR(10) NOT NULL,
            amount DOUBLE PRECISION NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS carts (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL,
            product_id UUID NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMPTZ NOT NULL,
            UNIQUE (user_id, product_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One order per (user, product)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL,
            product_id UUID NOT NULL,
            cart_id UUID NOT NULL,
            status VARCHAR(20) NOT NULL,
            choice VARCHAR(10) NOT NULL,
            total_amount DOUBLE PRECISION NOT NULL,
            initial_time INTEGER,
            end_time INTEGER,
            rent_time INTEGER,
            created_at TIMESTAMPTZ NOT NULL,
            CONSTRAINT orders_user_product_key UNIQUE (user_id, product_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id UUID PRIMARY KEY,
            seq BIGSERIAL NOT NULL,
            queue VARCHAR(255) NOT NULL,
            payload JSONB NOT NULL,
            status VARCHAR(20) NOT NULL,
            progress SMALLINT NOT NULL DEFAULT 0,
            attempts_made INTEGER NOT NULL DEFAULT 0,
            max_attempts INTEGER NOT NULL DEFAULT 1,
            backoff_kind VARCHAR(20) NOT NULL DEFAULT 'fixed',
            backoff_ms BIGINT NOT NULL DEFAULT 0,
            stalled_count INTEGER NOT NULL DEFAULT 0,
            enqueued_at TIMESTAMPTZ NOT NULL,
            available_at TIMESTAMPTZ NOT NULL,
            started_at TIMESTAMPTZ,
            finished_at TIMESTAMPTZ,
            worker_id VARCHAR(255),
            result JSONB,
            failed_reason TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_logs (
            id BIGSERIAL PRIMARY KEY,
            job_id UUID NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
            timestamp TIMESTAMPTZ NOT NULL,
            level VARCHAR(20) NOT NULL,
            message TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Claims scan waiting jobs of one queue in insertion order
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_jobs_queue_status_seq ON jobs(queue, status, seq)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_job_logs_job_id ON job_logs(job_id, id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_user_id ON orders(user_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
