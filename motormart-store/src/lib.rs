//! Motormart Store
//!
//! Persistence layer shared by the API and the worker.
//!
//! - `db`: Postgres pool creation and schema migrations
//! - `repository`: Order, product and cart stores, including transactional
//!   order sessions
//! - `queue`: Durable job queue and the `Queue` client handle
//! - `memory`: In-memory implementations of every store, for tests and local runs
//!
//! All stores are trait-based so the services above them can be exercised
//! without a database.

pub mod db;
pub mod error;
pub mod memory;
pub mod queue;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::{MemoryJobQueue, MemoryStore};
pub use queue::{JobQueue, PgJobQueue, Queue, STALLED_REASON, StalledJobs};
pub use repository::{
    CartStore, OrderStore, OrderTransaction, PgStore, ProductStore, ReadConcern, TxOptions,
    WriteConcern,
};
