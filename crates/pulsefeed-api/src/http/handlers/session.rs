//! Session HTTP handlers.
//!
//! Endpoints:
//! - GET  /api/v1/sessions/{user_id}         - Get a session with subscriptions
//! - POST /api/v1/sessions/{user_id}/restart - Reset training for a user

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use pulsefeed_core::repository::SessionRepository;
use pulsefeed_types::error::RepositoryError;

use crate::dispatch::{self, InboundEvent};
use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/sessions/{user_id} - Get a session and its subscriptions.
pub async fn get_session(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state
        .repo
        .get_session(user_id)
        .await?
        .ok_or(AppError::Repository(RepositoryError::NotFound))?;
    let subscriptions = state.repo.subscriptions(user_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let body = serde_json::json!({
        "session": session,
        "subscriptions": subscriptions,
    });
    Ok(Json(ApiResponse::success(body, request_id, elapsed)))
}

/// POST /api/v1/sessions/{user_id}/restart - Reset a user's training.
///
/// Runs through the same dispatch path as a chat-originated restart, so
/// the user sees the reset notice in their chat.
pub async fn restart_session(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    // Reject restarts for users that were never seen; dispatch would
    // silently create a session.
    state
        .repo
        .get_session(user_id)
        .await?
        .ok_or(AppError::Repository(RepositoryError::NotFound))?;

    dispatch::handle_event(
        &state,
        InboundEvent::Command {
            user_id,
            name: "restart".to_string(),
        },
    )
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?;

    let session = state
        .repo
        .get_session(user_id)
        .await?
        .ok_or(AppError::Repository(RepositoryError::NotFound))?;

    let elapsed = start.elapsed().as_millis() as u64;
    let body = serde_json::json!({
        "user_id": user_id,
        "training_state": session.training_state.to_string(),
    });
    Ok(Json(ApiResponse::success(body, request_id, elapsed)))
}
