//! Training flow state machine.
//!
//! `not_started → awaiting_preferences → awaiting_confirmation → completed`,
//! with an explicit restart from any state back to `not_started`. The flow
//! is the sole writer of training state. Every advance is persisted before
//! the in-memory session changes: a persistence failure is retried once and
//! then aborts the transition, so the machine can never grant feed access
//! without a durable record of the confirmation.

use std::sync::Arc;

use tracing::{info, warn};

use pulsefeed_types::error::{RepositoryError, TrainingError};
use pulsefeed_types::session::{TrainingState, UserSession};

use crate::repository::SessionRepository;

/// A user input event fed into the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingInput {
    /// Begin onboarding.
    Start,
    /// Source channels the user wants content from.
    SubmitPreferences { channels: Vec<String> },
    /// Confirm the selection and finish onboarding.
    Confirm,
    /// Explicit restart; the only path back to `not_started`.
    Restart,
}

impl TrainingInput {
    fn name(&self) -> &'static str {
        match self {
            TrainingInput::Start => "start",
            TrainingInput::SubmitPreferences { .. } => "preferences",
            TrainingInput::Confirm => "confirm",
            TrainingInput::Restart => "restart",
        }
    }
}

/// Normalize a channel handle: trim, strip a leading `@`, lowercase.
///
/// Returns `None` when the remainder is empty or contains characters that
/// cannot appear in a channel handle.
pub fn normalize_channel(raw: &str) -> Option<String> {
    let handle = raw.trim().trim_start_matches('@').to_lowercase();
    if handle.is_empty() || !handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some(handle)
}

/// The per-user onboarding state machine.
pub struct TrainingFlow<R: SessionRepository> {
    repo: Arc<R>,
}

impl<R: SessionRepository> TrainingFlow<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Apply one input event to the session, validating it against the
    /// current stage.
    ///
    /// Returns the new training state on an accepted transition. A
    /// mismatched input yields [`TrainingError::InvalidInput`] and leaves
    /// the state untouched (the caller re-prompts).
    pub async fn apply(
        &self,
        session: &mut UserSession,
        input: TrainingInput,
    ) -> Result<TrainingState, TrainingError> {
        let current = session.training_state;

        let target = match (current, &input) {
            (_, TrainingInput::Restart) => TrainingState::NotStarted,
            (TrainingState::NotStarted, TrainingInput::Start) => {
                TrainingState::AwaitingPreferences
            }
            (TrainingState::AwaitingPreferences, TrainingInput::SubmitPreferences { channels }) => {
                let normalized = Self::validate_channels(channels)?;
                self.persist_subscriptions(session.user_id, &normalized)
                    .await?;
                TrainingState::AwaitingConfirmation
            }
            (TrainingState::AwaitingConfirmation, TrainingInput::Confirm) => {
                TrainingState::Completed
            }
            (TrainingState::Completed, _) => {
                return Err(TrainingError::InvalidInput(
                    "training already completed; send restart to run it again".to_string(),
                ));
            }
            (state, input) => {
                return Err(TrainingError::InvalidInput(format!(
                    "'{}' not expected while {state}",
                    input.name()
                )));
            }
        };

        self.persist_state(session.user_id, target).await?;
        session.training_state = target;
        session.updated_at = chrono::Utc::now();
        info!(user_id = session.user_id, from = %current, to = %target, "training transition");
        Ok(target)
    }

    /// Validate and normalize a preference submission. At least one valid
    /// channel handle is required.
    fn validate_channels(channels: &[String]) -> Result<Vec<String>, TrainingError> {
        let mut normalized: Vec<String> = Vec::new();
        for raw in channels {
            match normalize_channel(raw) {
                Some(handle) => {
                    if !normalized.contains(&handle) {
                        normalized.push(handle);
                    }
                }
                None => {
                    return Err(TrainingError::InvalidInput(format!(
                        "'{raw}' is not a channel handle"
                    )));
                }
            }
        }
        if normalized.is_empty() {
            return Err(TrainingError::InvalidInput(
                "send at least one channel handle".to_string(),
            ));
        }
        Ok(normalized)
    }

    async fn persist_state(
        &self,
        user_id: i64,
        state: TrainingState,
    ) -> Result<(), TrainingError> {
        retry_once(
            || self.repo.set_training_state(user_id, state),
            user_id,
            "training state",
        )
        .await
    }

    async fn persist_subscriptions(
        &self,
        user_id: i64,
        channels: &[String],
    ) -> Result<(), TrainingError> {
        retry_once(
            || self.repo.replace_subscriptions(user_id, channels),
            user_id,
            "subscriptions",
        )
        .await
    }
}

/// Run a persistence operation, retrying once on failure.
async fn retry_once<F, Fut>(mut op: F, user_id: i64, what: &str) -> Result<(), TrainingError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<(), RepositoryError>>,
{
    if let Err(first) = op().await {
        warn!(user_id, error = %first, "persisting {what} failed, retrying");
        op().await.map_err(|e| {
            warn!(user_id, error = %e, "persisting {what} failed twice, aborting transition");
            TrainingError::Persistence(e.to_string())
        })?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// In-memory repository; `fail_next` makes the next N write calls fail.
    #[derive(Default)]
    struct MemRepo {
        states: Mutex<std::collections::HashMap<i64, TrainingState>>,
        subs: Mutex<std::collections::HashMap<i64, Vec<String>>>,
        fail_next: AtomicU32,
    }

    impl MemRepo {
        fn take_failure(&self) -> bool {
            self.fail_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }

        fn stored_state(&self, user_id: i64) -> Option<TrainingState> {
            self.states.lock().unwrap().get(&user_id).copied()
        }
    }

    impl SessionRepository for MemRepo {
        async fn get_session(&self, _user_id: i64) -> Result<Option<UserSession>, RepositoryError> {
            Ok(None)
        }

        async fn upsert_session(&self, _session: &UserSession) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn set_training_state(
            &self,
            user_id: i64,
            state: TrainingState,
        ) -> Result<(), RepositoryError> {
            if self.take_failure() {
                return Err(RepositoryError::Query("disk full".to_string()));
            }
            self.states.lock().unwrap().insert(user_id, state);
            Ok(())
        }

        async fn replace_subscriptions(
            &self,
            user_id: i64,
            channels: &[String],
        ) -> Result<(), RepositoryError> {
            if self.take_failure() {
                return Err(RepositoryError::Query("disk full".to_string()));
            }
            self.subs.lock().unwrap().insert(user_id, channels.to_vec());
            Ok(())
        }

        async fn subscriptions(&self, user_id: i64) -> Result<Vec<String>, RepositoryError> {
            Ok(self.subs.lock().unwrap().get(&user_id).cloned().unwrap_or_default())
        }
    }

    fn setup() -> (TrainingFlow<MemRepo>, Arc<MemRepo>, UserSession) {
        let repo = Arc::new(MemRepo::default());
        (TrainingFlow::new(Arc::clone(&repo)), repo, UserSession::new(7, "en_US"))
    }

    async fn run_to_completed(
        flow: &TrainingFlow<MemRepo>,
        session: &mut UserSession,
    ) {
        flow.apply(session, TrainingInput::Start).await.unwrap();
        flow.apply(
            session,
            TrainingInput::SubmitPreferences {
                channels: vec!["@durov".to_string()],
            },
        )
        .await
        .unwrap();
        flow.apply(session, TrainingInput::Confirm).await.unwrap();
    }

    #[tokio::test]
    async fn forward_path_never_skips_a_stage() {
        let (flow, _repo, mut session) = setup();

        let s1 = flow.apply(&mut session, TrainingInput::Start).await.unwrap();
        assert_eq!(s1, TrainingState::AwaitingPreferences);

        let s2 = flow
            .apply(
                &mut session,
                TrainingInput::SubmitPreferences {
                    channels: vec!["@durov".to_string(), "telegram".to_string()],
                },
            )
            .await
            .unwrap();
        assert_eq!(s2, TrainingState::AwaitingConfirmation);

        let s3 = flow.apply(&mut session, TrainingInput::Confirm).await.unwrap();
        assert_eq!(s3, TrainingState::Completed);
        assert!(session.training_state.feed_access());
    }

    #[tokio::test]
    async fn mismatched_input_reprompts_without_advancing() {
        let (flow, _repo, mut session) = setup();

        // Confirm before anything started
        let err = flow.apply(&mut session, TrainingInput::Confirm).await.unwrap_err();
        assert!(matches!(err, TrainingError::InvalidInput(_)));
        assert_eq!(session.training_state, TrainingState::NotStarted);

        // Skipping the preferences stage
        flow.apply(&mut session, TrainingInput::Start).await.unwrap();
        let err = flow.apply(&mut session, TrainingInput::Confirm).await.unwrap_err();
        assert!(matches!(err, TrainingError::InvalidInput(_)));
        assert_eq!(session.training_state, TrainingState::AwaitingPreferences);
    }

    #[tokio::test]
    async fn malformed_channels_are_user_correctable() {
        let (flow, repo, mut session) = setup();
        flow.apply(&mut session, TrainingInput::Start).await.unwrap();

        let err = flow
            .apply(
                &mut session,
                TrainingInput::SubmitPreferences {
                    channels: vec!["not a channel!".to_string()],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TrainingError::InvalidInput(_)));
        assert_eq!(session.training_state, TrainingState::AwaitingPreferences);
        assert!(repo.subscriptions(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscriptions_are_normalized_and_deduplicated() {
        let (flow, repo, mut session) = setup();
        flow.apply(&mut session, TrainingInput::Start).await.unwrap();
        flow.apply(
            &mut session,
            TrainingInput::SubmitPreferences {
                channels: vec![
                    "@Durov ".to_string(),
                    "durov".to_string(),
                    "@telegram".to_string(),
                ],
            },
        )
        .await
        .unwrap();

        assert_eq!(
            repo.subscriptions(7).await.unwrap(),
            vec!["durov".to_string(), "telegram".to_string()]
        );
    }

    #[tokio::test]
    async fn restart_is_the_only_path_back() {
        let (flow, repo, mut session) = setup();
        run_to_completed(&flow, &mut session).await;

        // Completed rejects everything but restart
        let err = flow.apply(&mut session, TrainingInput::Start).await.unwrap_err();
        assert!(matches!(err, TrainingError::InvalidInput(_)));
        assert_eq!(session.training_state, TrainingState::Completed);

        let state = flow.apply(&mut session, TrainingInput::Restart).await.unwrap();
        assert_eq!(state, TrainingState::NotStarted);
        assert_eq!(repo.stored_state(7), Some(TrainingState::NotStarted));
    }

    #[tokio::test]
    async fn single_persistence_failure_is_retried() {
        let (flow, repo, mut session) = setup();
        repo.fail_next.store(1, Ordering::SeqCst);

        let state = flow.apply(&mut session, TrainingInput::Start).await.unwrap();
        assert_eq!(state, TrainingState::AwaitingPreferences);
        assert_eq!(repo.stored_state(7), Some(TrainingState::AwaitingPreferences));
    }

    #[tokio::test]
    async fn exhausted_persistence_failure_aborts_the_transition() {
        let (flow, repo, mut session) = setup();
        flow.apply(&mut session, TrainingInput::Start).await.unwrap();
        flow.apply(
            &mut session,
            TrainingInput::SubmitPreferences {
                channels: vec!["durov".to_string()],
            },
        )
        .await
        .unwrap();

        // Both the write and its retry fail during the final confirmation.
        repo.fail_next.store(2, Ordering::SeqCst);
        let err = flow.apply(&mut session, TrainingInput::Confirm).await.unwrap_err();
        assert!(matches!(err, TrainingError::Persistence(_)));

        // Not completed -- neither in memory nor durably.
        assert_eq!(session.training_state, TrainingState::AwaitingConfirmation);
        assert_eq!(
            repo.stored_state(7),
            Some(TrainingState::AwaitingConfirmation)
        );
        assert!(!session.training_state.feed_access());
    }

    #[test]
    fn normalize_channel_shapes() {
        assert_eq!(normalize_channel(" @Durov "), Some("durov".to_string()));
        assert_eq!(normalize_channel("tele_gram"), Some("tele_gram".to_string()));
        assert_eq!(normalize_channel("@"), None);
        assert_eq!(normalize_channel("has space"), None);
        assert_eq!(normalize_channel(""), None);
    }
}
