//! Repository Module
//!
//! Data access for the records the order pipeline reads and writes.
//! Each repository is a trait so services can be wired to Postgres in
//! production and to the in-memory store in tests.

pub mod cart;
pub mod order;
pub mod product;

use sqlx::PgPool;

pub use cart::CartStore;
pub use order::{OrderStore, OrderTransaction, ReadConcern, TxOptions, WriteConcern};
pub use product::ProductStore;

/// Postgres-backed implementation of every repository trait
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
