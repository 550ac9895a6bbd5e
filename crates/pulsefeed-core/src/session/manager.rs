//! Session manager: one locked context per user.
//!
//! All events for a user pass through that user's async mutex, so a later
//! event always observes the state produced by an earlier event's completed
//! transition. Unrelated users never contend -- there is no global lock.
//! The message registry lives inside the same context, which makes the
//! "only the task handling this user's event mutates it" rule structural.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use pulsefeed_types::error::RepositoryError;
use pulsefeed_types::session::UserSession;

use crate::messaging::{ChatTransport, MessageRegistry};
use crate::repository::SessionRepository;

/// Everything serialized under one user's lock: the durable session state
/// and the registry of messages currently in that user's chat.
pub struct SessionCtx<T: ChatTransport> {
    pub session: UserSession,
    pub registry: MessageRegistry<T>,
}

/// Process-wide map of per-user session contexts.
pub struct SessionManager<R: SessionRepository, T: ChatTransport> {
    repo: Arc<R>,
    transport: Arc<T>,
    default_language: String,
    sessions: DashMap<i64, Arc<Mutex<SessionCtx<T>>>>,
}

impl<R: SessionRepository, T: ChatTransport> SessionManager<R, T> {
    pub fn new(repo: Arc<R>, transport: Arc<T>, default_language: impl Into<String>) -> Self {
        Self {
            repo,
            transport,
            default_language: default_language.into(),
            sessions: DashMap::new(),
        }
    }

    /// Get the locked context for a user, loading the durable session on
    /// first contact (and creating it for a user never seen before).
    ///
    /// Callers lock the returned mutex for the duration of one event.
    pub async fn context(
        &self,
        user_id: i64,
    ) -> Result<Arc<Mutex<SessionCtx<T>>>, RepositoryError> {
        if let Some(entry) = self.sessions.get(&user_id) {
            return Ok(Arc::clone(&entry));
        }

        let session = match self.repo.get_session(user_id).await? {
            Some(session) => session,
            None => {
                let session = UserSession::new(user_id, &self.default_language);
                self.repo.upsert_session(&session).await?;
                debug!(user_id, "created session on first contact");
                session
            }
        };

        // Two tasks can race the load above; the entry API keeps exactly
        // one context and the upsert is idempotent.
        let entry = self.sessions.entry(user_id).or_insert_with(|| {
            Arc::new(Mutex::new(SessionCtx {
                registry: MessageRegistry::new(user_id, Arc::clone(&self.transport)),
                session,
            }))
        });
        Ok(Arc::clone(&entry))
    }

    /// Drop a user's in-memory context (durable state is untouched). The
    /// next event reloads from the repository.
    pub fn evict(&self, user_id: i64) -> bool {
        self.sessions.remove(&user_id).is_some()
    }

    /// Number of users with an in-memory context.
    pub fn resident_count(&self) -> usize {
        self.sessions.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

    use pulsefeed_types::error::TransportError;
    use pulsefeed_types::message::{MessageContent, MessageHandle};
    use pulsefeed_types::session::TrainingState;

    #[derive(Default)]
    struct NullTransport {
        next: AtomicI64,
    }

    impl ChatTransport for NullTransport {
        async fn send(
            &self,
            _user_id: i64,
            _content: &MessageContent,
        ) -> Result<MessageHandle, TransportError> {
            Ok(MessageHandle(self.next.fetch_add(1, Ordering::SeqCst) + 1))
        }

        async fn edit_or_delete(
            &self,
            _user_id: i64,
            _handle: MessageHandle,
        ) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemRepo {
        sessions: StdMutex<HashMap<i64, UserSession>>,
        loads: AtomicU32,
    }

    impl SessionRepository for MemRepo {
        async fn get_session(&self, user_id: i64) -> Result<Option<UserSession>, RepositoryError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.sessions.lock().unwrap().get(&user_id).cloned())
        }

        async fn upsert_session(&self, session: &UserSession) -> Result<(), RepositoryError> {
            self.sessions
                .lock()
                .unwrap()
                .insert(session.user_id, session.clone());
            Ok(())
        }

        async fn set_training_state(
            &self,
            user_id: i64,
            state: TrainingState,
        ) -> Result<(), RepositoryError> {
            if let Some(s) = self.sessions.lock().unwrap().get_mut(&user_id) {
                s.training_state = state;
            }
            Ok(())
        }

        async fn replace_subscriptions(
            &self,
            _user_id: i64,
            _channels: &[String],
        ) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn subscriptions(&self, _user_id: i64) -> Result<Vec<String>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    fn make_manager() -> SessionManager<MemRepo, NullTransport> {
        SessionManager::new(
            Arc::new(MemRepo::default()),
            Arc::new(NullTransport::default()),
            "en_US",
        )
    }

    #[tokio::test]
    async fn first_contact_creates_and_persists_session() {
        let manager = make_manager();
        let ctx = manager.context(42).await.unwrap();
        let guard = ctx.lock().await;
        assert_eq!(guard.session.user_id, 42);
        assert_eq!(guard.session.training_state, TrainingState::NotStarted);
        assert_eq!(guard.session.language, "en_US");
    }

    #[tokio::test]
    async fn repeat_contact_reuses_resident_context() {
        let manager = make_manager();
        let first = manager.context(42).await.unwrap();
        let second = manager.context(42).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.resident_count(), 1);
    }

    #[tokio::test]
    async fn later_event_observes_earlier_completed_transition() {
        let manager = Arc::new(make_manager());

        // First event mutates under the lock
        {
            let ctx = manager.context(9).await.unwrap();
            let mut guard = ctx.lock().await;
            guard.session.training_state = TrainingState::AwaitingPreferences;
        }

        // A "later" event for the same user sees the new state
        let ctx = manager.context(9).await.unwrap();
        assert_eq!(
            ctx.lock().await.session.training_state,
            TrainingState::AwaitingPreferences
        );
    }

    #[tokio::test]
    async fn evict_forces_reload_from_repository() {
        let manager = make_manager();
        manager.context(5).await.unwrap();
        assert!(manager.evict(5));
        assert_eq!(manager.resident_count(), 0);

        // Reload finds the persisted session instead of creating a new one
        let ctx = manager.context(5).await.unwrap();
        assert_eq!(ctx.lock().await.session.user_id, 5);
    }

    #[tokio::test]
    async fn concurrent_first_contacts_share_one_context() {
        let manager = Arc::new(make_manager());
        let a = {
            let m = Arc::clone(&manager);
            tokio::spawn(async move { m.context(1).await.unwrap() })
        };
        let b = {
            let m = Arc::clone(&manager);
            tokio::spawn(async move { m.context(1).await.unwrap() })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(manager.resident_count(), 1);
    }
}
