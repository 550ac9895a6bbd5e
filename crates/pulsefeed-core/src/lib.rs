//! Orchestration logic and port traits for Pulsefeed.
//!
//! This crate defines the "ports" (transport, oracle, worker, repository
//! traits) that the infrastructure layer implements, plus the coordination
//! logic built on them: the per-user message registry, the training flow
//! state machine, the scrape job coordinator, and the feed orchestrator.
//! It depends only on `pulsefeed-types` -- never on `pulsefeed-infra` or
//! any database/IO crate.

pub mod feed;
pub mod messaging;
pub mod repository;
pub mod scrape;
pub mod session;
pub mod training;
