//! User session and training state types.
//!
//! A session is created on first contact and survives process restarts via
//! the session repository. Training state only moves forward through the
//! onboarding stages; the one path back is an explicit restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Onboarding stage of a user.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (training_state IN ('not_started', 'awaiting_preferences',
/// 'awaiting_confirmation', 'completed'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingState {
    NotStarted,
    AwaitingPreferences,
    AwaitingConfirmation,
    Completed,
}

impl TrainingState {
    /// Whether feed access is granted. Only the terminal stage qualifies.
    pub fn feed_access(self) -> bool {
        matches!(self, TrainingState::Completed)
    }

    /// The next forward stage, if any.
    pub fn next(self) -> Option<TrainingState> {
        match self {
            TrainingState::NotStarted => Some(TrainingState::AwaitingPreferences),
            TrainingState::AwaitingPreferences => Some(TrainingState::AwaitingConfirmation),
            TrainingState::AwaitingConfirmation => Some(TrainingState::Completed),
            TrainingState::Completed => None,
        }
    }
}

impl Default for TrainingState {
    fn default() -> Self {
        TrainingState::NotStarted
    }
}

impl fmt::Display for TrainingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingState::NotStarted => write!(f, "not_started"),
            TrainingState::AwaitingPreferences => write!(f, "awaiting_preferences"),
            TrainingState::AwaitingConfirmation => write!(f, "awaiting_confirmation"),
            TrainingState::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for TrainingState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "not_started" => Ok(TrainingState::NotStarted),
            "awaiting_preferences" => Ok(TrainingState::AwaitingPreferences),
            "awaiting_confirmation" => Ok(TrainingState::AwaitingConfirmation),
            "completed" => Ok(TrainingState::Completed),
            other => Err(format!("invalid training state: '{other}'")),
        }
    }
}

/// A chat participant's session.
///
/// Mutated only by the training flow and the feed orchestrator for that
/// user, under the per-user session lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: i64,
    /// Locale preference, e.g. `en_US`.
    pub language: String,
    pub training_state: TrainingState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserSession {
    /// Fresh session for a user seen for the first time.
    pub fn new(user_id: i64, language: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            language: language.into(),
            training_state: TrainingState::NotStarted,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_state_round_trip() {
        for state in [
            TrainingState::NotStarted,
            TrainingState::AwaitingPreferences,
            TrainingState::AwaitingConfirmation,
            TrainingState::Completed,
        ] {
            let parsed: TrainingState = state.to_string().parse().unwrap();
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn forward_chain_ends_at_completed() {
        let mut state = TrainingState::NotStarted;
        let mut hops = 0;
        while let Some(next) = state.next() {
            state = next;
            hops += 1;
        }
        assert_eq!(state, TrainingState::Completed);
        assert_eq!(hops, 3);
    }

    #[test]
    fn feed_access_only_when_completed() {
        assert!(!TrainingState::NotStarted.feed_access());
        assert!(!TrainingState::AwaitingConfirmation.feed_access());
        assert!(TrainingState::Completed.feed_access());
    }

    #[test]
    fn new_session_defaults() {
        let session = UserSession::new(42, "en_US");
        assert_eq!(session.user_id, 42);
        assert_eq!(session.training_state, TrainingState::NotStarted);
    }
}
