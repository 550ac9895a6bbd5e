//! Session repository trait definition.
//!
//! User sessions and training state must survive process restarts for any
//! user who has begun but not completed onboarding, so this port backs
//! the in-memory session map with durable storage.

use pulsefeed_types::error::RepositoryError;
use pulsefeed_types::session::{TrainingState, UserSession};

/// Repository trait for user session persistence.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait SessionRepository: Send + Sync + 'static {
    /// Get a session by user id.
    fn get_session(
        &self,
        user_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<UserSession>, RepositoryError>> + Send;

    /// Insert or replace a session.
    fn upsert_session(
        &self,
        session: &UserSession,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Persist a training state transition for an existing session.
    fn set_training_state(
        &self,
        user_id: i64,
        state: TrainingState,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Replace the user's channel subscriptions.
    fn replace_subscriptions(
        &self,
        user_id: i64,
        channels: &[String],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The user's channel subscriptions, insertion-ordered.
    fn subscriptions(
        &self,
        user_id: i64,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send;
}
