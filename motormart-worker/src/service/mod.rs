//! Service layer
//!
//! Job handlers contain the business logic the worker runs for each queue.
//! Handlers are trait-based so the poller can be exercised with stubs.

mod confirmation;

use std::sync::Arc;

use async_trait::async_trait;
use motormart_core::outcome::Reply;

use crate::context::JobContext;

pub use confirmation::OrderConfirmation;

/// Processes one delivery of a job
///
/// Deliveries are at-least-once, so a handler must be safe to re-run on a
/// job it already processed.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Returns the reply recorded as the job result
    ///
    /// 2xx and 4xx replies complete the job; 5xx replies and errors fail it.
    async fn handle(&self, ctx: Arc<JobContext>) -> anyhow::Result<Reply>;
}
