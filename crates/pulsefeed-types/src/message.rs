//! Tracked message types for the per-user message registry.
//!
//! Every message the bot sends into a chat is tracked with a retention
//! class that decides its cleanup policy. The classes differ only in
//! policy, expressed as data (see [`RetentionPolicy`]), not in behavior.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Well-known message purposes.
///
/// A purpose names the logical slot a message occupies in the chat
/// ("the menu", "the status banner"). Ephemeral messages are deduplicated
/// per purpose: sending a new one retracts the previous holder.
pub mod purpose {
    pub const MENU: &str = "menu";
    pub const STATUS: &str = "status";
    pub const FEED_ITEM: &str = "feed_item";
    pub const FEED_CONTROLS: &str = "feed_controls";
    pub const TRAINING_PROMPT: &str = "training_prompt";
    pub const NOTICE: &str = "notice";
}

/// Retention class of a tracked message.
///
/// Maps to the CHECK constraint style used elsewhere in the schema:
/// `system`, `ephemeral`, or `onetime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionClass {
    /// Persistent UI (menus); never auto-removed.
    System,
    /// Temporary status messages; at most one live per purpose.
    Ephemeral,
    /// One-time interaction messages; retracted after the interaction
    /// completes.
    Onetime,
}

impl fmt::Display for RetentionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetentionClass::System => write!(f, "system"),
            RetentionClass::Ephemeral => write!(f, "ephemeral"),
            RetentionClass::Onetime => write!(f, "onetime"),
        }
    }
}

impl FromStr for RetentionClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(RetentionClass::System),
            "ephemeral" => Ok(RetentionClass::Ephemeral),
            "onetime" => Ok(RetentionClass::Onetime),
            other => Err(format!("invalid retention class: '{other}'")),
        }
    }
}

/// Cleanup policy for one retention class.
///
/// The registry consults this table instead of dispatching on the class,
/// so adding a class means adding a row, not a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Sending a new message with the same purpose retracts the old one.
    pub replace_prior: bool,
    /// Retracted by `sweep_onetime` once the owning interaction completes.
    pub sweep_after_interaction: bool,
}

impl RetentionClass {
    /// Policy table for all retention classes.
    pub fn policy(self) -> RetentionPolicy {
        match self {
            RetentionClass::System => RetentionPolicy {
                replace_prior: false,
                sweep_after_interaction: false,
            },
            RetentionClass::Ephemeral => RetentionPolicy {
                replace_prior: true,
                sweep_after_interaction: false,
            },
            RetentionClass::Onetime => RetentionPolicy {
                replace_prior: false,
                sweep_after_interaction: true,
            },
        }
    }
}

/// Chat-scoped identifier of a delivered message, as assigned by the
/// transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle(pub i64);

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a tracked message within the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    /// Delivered and currently displayed.
    Live,
    /// Removed (or neutralized) at the transport.
    Retracted,
    /// Retraction was attempted but the transport call failed; a later
    /// best-effort cleanup pass retries these.
    Stale,
}

/// A message delivered into a user's chat, tracked by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedMessage {
    pub handle: MessageHandle,
    pub class: RetentionClass,
    /// Logical slot this message occupies (see [`purpose`]).
    pub purpose: String,
    /// Interaction context for onetime sweeps (e.g. a feed delivery id).
    pub context: Option<String>,
    pub created_at: DateTime<Utc>,
    pub state: MessageState,
}

/// Kind of media attached to a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Photo => write!(f, "photo"),
        }
    }
}

/// Reference to a media object held by the scrape worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub media_id: i64,
    pub kind: MediaKind,
}

/// Outbound message body handed to the chat transport.
///
/// The transport wire format is out of scope; this is the minimal shape
/// the orchestration layer needs to produce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageContent {
    pub text: String,
    /// Raw photo bytes fetched from the scrape worker, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<u8>>,
}

impl MessageContent {
    /// Text-only message body.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            photo: None,
        }
    }
}
