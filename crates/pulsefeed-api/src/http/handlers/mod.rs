//! HTTP request handlers.

pub mod event;
pub mod feed;
pub mod session;
