//! Inbound event HTTP handler.
//!
//! Endpoint:
//! - POST /api/v1/events - Accept a chat event for asynchronous dispatch

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::error;
use uuid::Uuid;

use crate::dispatch::{self, InboundEvent};
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/events - Accept an event and dispatch it in the background.
///
/// Returns 202 immediately; handling serializes per user on the session
/// lock, so acceptance order for one user is processing order.
pub async fn submit_event(
    State(state): State<AppState>,
    Json(event): Json<InboundEvent>,
) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let user_id = event.user_id();

    tokio::spawn(async move {
        if let Err(e) = dispatch::handle_event(&state, event).await {
            error!(user_id, error = %e, "event dispatch failed");
        }
    });

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(
        serde_json::json!({"accepted": true, "user_id": user_id}),
        request_id,
        elapsed,
    );
    (StatusCode::ACCEPTED, Json(resp))
}
