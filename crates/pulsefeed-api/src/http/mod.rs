//! HTTP/REST API layer for Pulsefeed.
//!
//! Axum-based REST API at `/api/v1/` with envelope response format and
//! CORS support. The chat bridge posts inbound events here; the other
//! endpoints exist for inspection and operations.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
