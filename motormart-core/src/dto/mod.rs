//! Data Transfer Objects
//!
//! This module contains DTOs exchanged between the HTTP API and its callers
//! (the CLI and any front end). They are thin representations of domain
//! entities shaped for the wire.

pub mod job;
pub mod order;
