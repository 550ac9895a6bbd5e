//! Error taxonomy for Pulsefeed.
//!
//! Component-local recoverable errors are absorbed at the component
//! boundary; only upstream unavailability and exhausted persistence
//! failures cross into user-visible messaging. "Not enough content" is
//! never an error -- that is the degraded-result path.

use thiserror::Error;

/// Errors from repository operations (used by trait definitions in
/// pulsefeed-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}

/// Errors from the chat transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport unreachable: {0}")]
    Unavailable(String),

    #[error("message already gone upstream")]
    MessageGone,

    #[error("send rejected: {0}")]
    Rejected(String),
}

/// Errors from the recommendation oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle unreachable: {0}")]
    Unavailable(String),

    #[error("malformed oracle response: {0}")]
    Malformed(String),
}

/// Errors from the scrape worker.
///
/// Scrape failures are logged and treated as "no new content"; they are
/// never surfaced raw to the user.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("scrape worker unreachable: {0}")]
    Unavailable(String),

    #[error("channel '{0}' rejected by worker: {1}")]
    ChannelRejected(String, String),

    #[error("media not found")]
    MediaNotFound,
}

/// Errors from the training flow state machine.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// User-correctable input mismatch; the flow re-prompts and does not
    /// advance.
    #[error("invalid input for current stage: {0}")]
    InvalidInput(String),

    /// Persisting the transition failed after one retry. The transition
    /// is aborted; the state machine never advances on persistence
    /// failure.
    #[error("could not persist training transition: {0}")]
    Persistence(String),
}

/// Errors from the feed orchestrator.
///
/// Reserved for oracle/transport unavailability -- a short feed is a
/// degraded result, not an error.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("recommendation oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("chat transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("feed access not granted: training is {0}")]
    NotEligible(String),
}

impl From<OracleError> for FeedError {
    fn from(e: OracleError) -> Self {
        FeedError::OracleUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_error_display() {
        let err = TrainingError::InvalidInput("expected confirmation".to_string());
        assert_eq!(
            err.to_string(),
            "invalid input for current stage: expected confirmation"
        );
    }

    #[test]
    fn oracle_error_converts_to_feed_error() {
        let err: FeedError = OracleError::Unavailable("connect refused".to_string()).into();
        assert!(matches!(err, FeedError::OracleUnavailable(_)));
        assert!(err.to_string().contains("connect refused"));
    }

    #[test]
    fn repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }
}
