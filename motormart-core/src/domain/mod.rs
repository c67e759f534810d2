//! Core domain types
//!
//! This module contains the core domain structures used across Motormart services.
//! These types are shared between the API (which creates orders and enqueues jobs)
//! and the worker (which claims jobs and confirms orders).

pub mod cart;
pub mod job;
pub mod log;
pub mod order;
pub mod product;
