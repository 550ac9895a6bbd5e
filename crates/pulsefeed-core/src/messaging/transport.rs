//! Chat transport port.
//!
//! The transport is a thin I/O wrapper around the upstream chat protocol.
//! Its wire format is out of scope here; the registry only needs to send
//! a message and to remove (or neutralize) one it sent earlier.

use pulsefeed_types::error::TransportError;
use pulsefeed_types::message::{MessageContent, MessageHandle};

/// Outbound chat operations.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ChatTransport: Send + Sync + 'static {
    /// Deliver a message into the user's chat, returning its chat-scoped
    /// handle.
    fn send(
        &self,
        user_id: i64,
        content: &MessageContent,
    ) -> impl std::future::Future<Output = Result<MessageHandle, TransportError>> + Send;

    /// Remove the message, or neutralize it (e.g. strip its buttons) when
    /// removal is not possible upstream.
    fn edit_or_delete(
        &self,
        user_id: i64,
        handle: MessageHandle,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}
