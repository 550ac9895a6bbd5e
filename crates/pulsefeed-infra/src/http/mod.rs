//! HTTP clients for the external services pulsefeed talks to.
//!
//! Each client implements one of the core ports: the recommendation
//! oracle, the scrape worker, and the chat transport.

pub mod oracle;
pub mod scraper;
pub mod transport;

/// Build the shared reqwest client with the given request timeout.
///
/// Builder failure is a startup misconfiguration (bad TLS backend), so
/// it aborts wiring rather than continuing with a client that silently
/// lost its timeout.
pub(crate) fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("pulsefeed/0.1")
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .expect("failed to create reqwest client")
}
