//! Service Module
//!
//! Business logic layer for the API.
//! Services orchestrate between stores and contain domain logic.

pub mod job;
pub mod order;

pub use job::{JobError, JobService};
pub use order::OrderService;
