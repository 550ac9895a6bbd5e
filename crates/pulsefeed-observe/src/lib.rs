//! Observability setup for Pulsefeed.

pub mod tracing_setup;
