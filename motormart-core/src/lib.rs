//! Motormart Core
//!
//! Core types and abstractions for the Motormart order pipeline.
//!
//! This crate contains:
//! - Domain types: Core business entities (Order, Product, Job, etc.)
//! - DTOs: Data transfer objects for the HTTP surface and the CLI
//! - Outcomes: Typed success/rejection results shared by every layer
//! - Pricing: Order total computation

pub mod domain;
pub mod dto;
pub mod outcome;
pub mod pricing;
