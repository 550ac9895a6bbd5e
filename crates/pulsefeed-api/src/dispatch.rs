//! Inbound chat event dispatch.
//!
//! One event is handled end to end under its user's session lock: sweep
//! stale messages, route to the training flow or the feed orchestrator,
//! and reply through the user's message registry. Events for different
//! users run concurrently; events for the same user serialize on the
//! session mutex.

use serde::Deserialize;
use tracing::{debug, warn};

use pulsefeed_core::messaging::MessageRegistry;
use pulsefeed_core::session::SessionCtx;
use pulsefeed_core::training::{TrainingInput, normalize_channel};
use pulsefeed_types::error::TrainingError;
use pulsefeed_types::feed::FeedRequest;
use pulsefeed_types::message::{MessageContent, RetentionClass, purpose};
use pulsefeed_types::session::TrainingState;

use pulsefeed_infra::http::transport::HttpChatTransport;

use crate::state::AppState;

/// An event arriving from the chat bridge.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A slash command, name without the leading slash.
    Command { user_id: i64, name: String },
    /// Free-form text.
    Text { user_id: i64, text: String },
    /// A button press, with the interaction context it belongs to.
    Callback {
        user_id: i64,
        data: String,
        #[serde(default)]
        context: Option<String>,
    },
}

impl InboundEvent {
    pub fn user_id(&self) -> i64 {
        match self {
            InboundEvent::Command { user_id, .. }
            | InboundEvent::Text { user_id, .. }
            | InboundEvent::Callback { user_id, .. } => *user_id,
        }
    }
}

/// Split a preferences message into raw channel tokens.
///
/// Users paste handles separated by spaces, commas, or newlines; the
/// training flow does normalization and validation.
pub fn split_channel_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Confirmation reply listing the accepted channels. Changing the list
/// at this stage goes through /restart; free text is not accepted.
fn confirmation_prompt(channels: &[String]) -> String {
    format!(
        "Got it: {}. Send confirm to finish, or /restart to pick again.",
        channels
            .iter()
            .map(|c| format!("@{c}"))
            .collect::<Vec<_>>()
            .join(" ")
    )
}

/// Handle one inbound event to completion.
pub async fn handle_event(state: &AppState, event: InboundEvent) -> anyhow::Result<()> {
    let user_id = event.user_id();
    let ctx = state.sessions.context(user_id).await?;
    let mut guard = ctx.lock().await;

    // Retry retractions that failed on earlier events.
    let reconciled = guard.registry.sweep_stale().await;
    if reconciled > 0 {
        debug!(user_id, reconciled, "stale messages reconciled");
    }

    match event {
        InboundEvent::Command { name, .. } => match name.as_str() {
            "start" => apply_training(state, &mut guard, TrainingInput::Start).await,
            "restart" => apply_training(state, &mut guard, TrainingInput::Restart).await,
            "feed" => run_feed(state, &mut guard).await,
            other => {
                notice(&mut guard.registry, &format!("Unknown command: /{other}")).await;
                Ok(())
            }
        },

        InboundEvent::Text { text, .. } => {
            if guard.session.training_state == TrainingState::AwaitingPreferences {
                let tokens = split_channel_tokens(&text);
                apply_training(
                    state,
                    &mut guard,
                    TrainingInput::SubmitPreferences { channels: tokens },
                )
                .await
            } else {
                notice(
                    &mut guard.registry,
                    "Send /feed for your feed, or /start to set up your channels.",
                )
                .await;
                Ok(())
            }
        }

        InboundEvent::Callback { data, context, .. } => {
            // A button press finishes the interaction it belongs to, so
            // its onetime messages come down first.
            if let Some(context) = context.as_deref() {
                guard.registry.sweep_onetime(context).await;
            }
            match data.as_str() {
                "confirm" => apply_training(state, &mut guard, TrainingInput::Confirm).await,
                "restart" => apply_training(state, &mut guard, TrainingInput::Restart).await,
                "feed" => run_feed(state, &mut guard).await,
                other => {
                    debug!(user_id, data = other, "unhandled callback");
                    Ok(())
                }
            }
        }
    }
}

/// Apply one training input and reply according to the resulting stage.
async fn apply_training(
    state: &AppState,
    guard: &mut SessionCtx<HttpChatTransport>,
    input: TrainingInput,
) -> anyhow::Result<()> {
    let joined_channels = match &input {
        TrainingInput::SubmitPreferences { channels } => channels
            .iter()
            .filter_map(|raw| normalize_channel(raw))
            .collect(),
        _ => Vec::new(),
    };

    let registry_text = match state.training.apply(&mut guard.session, input).await {
        Ok(TrainingState::AwaitingPreferences) => {
            "Which channels should your feed draw from? Send their handles, \
             e.g. @durov @telegram."
                .to_string()
        }
        Ok(TrainingState::AwaitingConfirmation) => {
            // Make sure the worker can observe the chosen channels before
            // the first scrape is ever needed.
            for channel in &joined_channels {
                state.coordinator.ensure_joined(channel).await;
            }
            confirmation_prompt(&joined_channels)
        }
        Ok(TrainingState::Completed) => {
            guard.registry.retract_by_purpose(purpose::TRAINING_PROMPT).await;
            "All set. Send /feed whenever you want fresh content.".to_string()
        }
        Ok(TrainingState::NotStarted) => {
            "Training reset. Send /start to pick your channels again.".to_string()
        }
        Err(TrainingError::InvalidInput(msg)) => {
            // State untouched; re-prompt with the reason.
            msg
        }
        Err(e @ TrainingError::Persistence(_)) => {
            warn!(user_id = guard.session.user_id, error = %e, "training persistence failed");
            "Something went wrong saving your progress. Please try again.".to_string()
        }
    };

    if let Err(e) = guard
        .registry
        .send(
            &MessageContent::text(registry_text),
            RetentionClass::Ephemeral,
            purpose::TRAINING_PROMPT,
            None,
        )
        .await
    {
        warn!(user_id = guard.session.user_id, error = %e, "training reply send failed");
    }
    Ok(())
}

/// Produce and render a feed for the user, gated on completed training.
async fn run_feed(
    state: &AppState,
    guard: &mut SessionCtx<HttpChatTransport>,
) -> anyhow::Result<()> {
    let user_id = guard.session.user_id;

    if !guard.session.training_state.feed_access() {
        notice(
            &mut guard.registry,
            "Your feed unlocks after training. Send /start to set it up.",
        )
        .await;
        return Ok(());
    }

    let request = FeedRequest::new(user_id, state.config.feed.default_count);
    match state.orchestrator.get_feed(request).await {
        Ok(items) if items.is_empty() => {
            notice(
                &mut guard.registry,
                "Nothing fresh right now. Try again in a little while.",
            )
            .await;
        }
        Ok(items) => {
            if let Err(e) = state
                .orchestrator
                .render_feed(&mut guard.registry, &items)
                .await
            {
                warn!(user_id, error = %e, "feed render failed");
                notice(
                    &mut guard.registry,
                    "Could not deliver your feed. Please try again.",
                )
                .await;
            }
        }
        Err(e) => {
            warn!(user_id, error = %e, "feed request failed");
            notice(
                &mut guard.registry,
                "The feed service is unavailable right now. Please try again later.",
            )
            .await;
        }
    }
    Ok(())
}

/// Best-effort ephemeral status message; a failed notice is only logged.
async fn notice(registry: &mut MessageRegistry<HttpChatTransport>, text: &str) {
    if let Err(e) = registry
        .send(
            &MessageContent::text(text),
            RetentionClass::Ephemeral,
            purpose::NOTICE,
            None,
        )
        .await
    {
        warn!(error = %e, "notice send failed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
