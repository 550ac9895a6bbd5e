//! Per-user session ownership and event serialization.

pub mod manager;

pub use manager::{SessionCtx, SessionManager};
