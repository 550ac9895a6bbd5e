//! Infrastructure implementations for Pulsefeed.
//!
//! Pins the ports defined in `pulsefeed-core` to concrete technology:
//! SQLite (sqlx) for session persistence, reqwest HTTP clients for the
//! recommendation oracle, the scrape worker, and the chat transport
//! bridge, plus the TOML configuration loader.

pub mod config;
pub mod http;
pub mod sqlite;
