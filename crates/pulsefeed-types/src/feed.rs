//! Feed request and recommended item types.

use serde::{Deserialize, Serialize};

use crate::message::MediaRef;

/// A transient feed request. Lives only for one orchestration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedRequest {
    pub user_id: i64,
    /// Number of items the caller wants.
    pub count: usize,
    /// Override for the minimum viable candidate threshold; `None` uses
    /// the configured default.
    pub min_viable: Option<usize>,
}

impl FeedRequest {
    pub fn new(user_id: i64, count: usize) -> Self {
        Self {
            user_id,
            count,
            min_viable: None,
        }
    }
}

/// One ranked item returned by the recommendation oracle.
///
/// Oracle order is authoritative: the orchestrator preserves it verbatim
/// and never re-sorts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedItem {
    pub item_id: i64,
    /// Source channel handle, without the leading `@`.
    pub channel: String,
    pub text: String,
    /// Relevance score as reported by the oracle. Informational only.
    pub score: f64,
    #[serde(default)]
    pub media: Vec<MediaRef>,
}
