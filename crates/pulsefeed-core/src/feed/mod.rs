//! Feed orchestration: the recommendation oracle port, channel selection
//! port, and the top-level coordinator.

pub mod oracle;
pub mod orchestrator;

pub use oracle::{ChannelSelector, RecommendationOracle};
pub use orchestrator::FeedOrchestrator;
