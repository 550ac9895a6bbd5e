//! Message registry: single source of truth for what is currently
//! displayed to a user.
//!
//! One registry exists per user session and is only ever touched by the
//! task handling that user's event, so it carries no lock of its own.
//! Bookkeeping marks intent before the transport call; when the call
//! fails the entry is left `Stale` for a later best-effort cleanup pass
//! instead of surfacing an error.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use pulsefeed_types::error::TransportError;
use pulsefeed_types::message::{
    MessageContent, MessageHandle, MessageState, RetentionClass, TrackedMessage,
};

use super::transport::ChatTransport;

/// Tracks every message delivered to one user's chat, categorized by
/// retention class, and mediates cleanup through the transport.
pub struct MessageRegistry<T: ChatTransport> {
    user_id: i64,
    transport: Arc<T>,
    entries: Vec<TrackedMessage>,
}

impl<T: ChatTransport> MessageRegistry<T> {
    pub fn new(user_id: i64, transport: Arc<T>) -> Self {
        Self {
            user_id,
            transport,
            entries: Vec::new(),
        }
    }

    /// Send a message and record it.
    ///
    /// If the retention policy replaces priors (ephemeral) and a live
    /// message holds the same purpose, that one is retracted first.
    /// Retraction failure is logged and does not block the new message.
    pub async fn send(
        &mut self,
        content: &MessageContent,
        class: RetentionClass,
        purpose: &str,
        context: Option<&str>,
    ) -> Result<MessageHandle, TransportError> {
        if class.policy().replace_prior {
            if let Some(prior) = self.live_handle_by_purpose(purpose) {
                self.retract(prior).await;
            }
        }

        let handle = self.transport.send(self.user_id, content).await?;
        self.entries.push(TrackedMessage {
            handle,
            class,
            purpose: purpose.to_string(),
            context: context.map(str::to_string),
            created_at: Utc::now(),
            state: MessageState::Live,
        });
        debug!(user_id = self.user_id, %handle, %class, purpose, "registered message");
        Ok(handle)
    }

    /// Retract a tracked message. Idempotent: retracting a handle that is
    /// unknown or already retracted is a no-op.
    ///
    /// A retracted entry is dropped from the registry; only `Live` and
    /// `Stale` records are kept, so the entry list stays bounded by what
    /// is actually on screen.
    pub async fn retract(&mut self, handle: MessageHandle) {
        let Some(idx) = self
            .entries
            .iter()
            .position(|m| m.handle == handle && m.state == MessageState::Live)
        else {
            return;
        };

        // Mark intent first; reconcile to Stale if the transport call fails.
        self.entries[idx].state = MessageState::Retracted;
        match self.transport.edit_or_delete(self.user_id, handle).await {
            Ok(()) => {}
            Err(TransportError::MessageGone) => {
                // Already deleted upstream; registry state is correct.
                debug!(user_id = self.user_id, %handle, "message already gone upstream");
            }
            Err(e) => {
                warn!(user_id = self.user_id, %handle, error = %e, "retraction failed, marking stale");
                self.entries[idx].state = MessageState::Stale;
            }
        }
        if self.entries[idx].state == MessageState::Retracted {
            self.entries.remove(idx);
        }
    }

    /// Retract the current live holder of a purpose, if any.
    pub async fn retract_by_purpose(&mut self, purpose: &str) {
        if let Some(handle) = self.live_handle_by_purpose(purpose) {
            self.retract(handle).await;
        }
    }

    /// Retract all live onetime messages associated with an interaction
    /// context. Called after the interaction completes.
    pub async fn sweep_onetime(&mut self, context: &str) {
        let handles: Vec<MessageHandle> = self
            .entries
            .iter()
            .filter(|m| {
                m.state == MessageState::Live
                    && m.class.policy().sweep_after_interaction
                    && m.context.as_deref() == Some(context)
            })
            .map(|m| m.handle)
            .collect();

        for handle in handles {
            self.retract(handle).await;
        }
    }

    /// Best-effort cleanup pass over entries whose retraction previously
    /// failed. Returns the number of entries that were reconciled.
    pub async fn sweep_stale(&mut self) -> usize {
        let handles: Vec<MessageHandle> = self
            .entries
            .iter()
            .filter(|m| m.state == MessageState::Stale)
            .map(|m| m.handle)
            .collect();

        let mut reconciled = 0;
        for handle in handles {
            match self.transport.edit_or_delete(self.user_id, handle).await {
                Ok(()) | Err(TransportError::MessageGone) => {
                    self.entries.retain(|m| m.handle != handle);
                    reconciled += 1;
                }
                Err(e) => {
                    debug!(user_id = self.user_id, %handle, error = %e, "stale cleanup still failing");
                }
            }
        }
        reconciled
    }

    /// The latest live message with the given purpose.
    pub fn latest(&self, purpose: &str) -> Option<&TrackedMessage> {
        self.entries
            .iter()
            .rev()
            .find(|m| m.state == MessageState::Live && m.purpose == purpose)
    }

    /// Number of live messages, optionally filtered by class.
    pub fn live_count(&self, class: Option<RetentionClass>) -> usize {
        self.entries
            .iter()
            .filter(|m| m.state == MessageState::Live && class.is_none_or(|c| m.class == c))
            .count()
    }

    /// Total entries currently tracked (live or stale).
    pub fn tracked_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of entries stuck in `Stale`.
    pub fn stale_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|m| m.state == MessageState::Stale)
            .count()
    }

    fn live_handle_by_purpose(&self, purpose: &str) -> Option<MessageHandle> {
        self.latest(purpose).map(|m| m.handle)
    }
}

impl<T: ChatTransport> std::fmt::Debug for MessageRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRegistry")
            .field("user_id", &self.user_id)
            .field("tracked", &self.entries.len())
            .field("live", &self.live_count(None))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
