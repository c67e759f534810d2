//! Scheduler layer for the worker
//!
//! This layer handles polling the queue for new jobs and coordinating their
//! execution. It manages the lifecycle of jobs from claiming to completion.

pub mod poller;

pub use poller::JobPoller;
