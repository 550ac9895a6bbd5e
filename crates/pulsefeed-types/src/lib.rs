//! Shared domain types for Pulsefeed.
//!
//! This crate contains the core domain types used across the Pulsefeed
//! services: tracked messages, user sessions and training state, feed
//! requests, scrape jobs, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod feed;
pub mod message;
pub mod scrape;
pub mod session;
