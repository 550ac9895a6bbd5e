//! Recommendation oracle and channel selection ports.

use pulsefeed_types::error::{OracleError, RepositoryError};
use pulsefeed_types::feed::RecommendedItem;

/// The ranking oracle. Given a user and a count, returns a ranked
/// sequence of items, possibly shorter than requested. Order is
/// authoritative.
pub trait RecommendationOracle: Send + Sync + 'static {
    fn recommend(
        &self,
        user_id: i64,
        count: usize,
    ) -> impl std::future::Future<Output = Result<Vec<RecommendedItem>, OracleError>> + Send;
}

/// Picks the source channels most likely to yield fresh relevant content
/// for a user when the candidate pool runs dry.
pub trait ChannelSelector: Send + Sync + 'static {
    fn channels_for(
        &self,
        user_id: i64,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send;
}
