//! Feed inspection HTTP handler.
//!
//! Endpoint:
//! - GET /api/v1/feed/{user_id} - Produce a feed without delivering it

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use pulsefeed_core::repository::SessionRepository;
use pulsefeed_types::error::FeedError;
use pulsefeed_types::feed::{FeedRequest, RecommendedItem};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Query parameters for feed requests.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub count: Option<usize>,
}

/// GET /api/v1/feed/{user_id} - Produce the ordered item sequence a feed
/// delivery would render, without sending anything into the chat.
///
/// Gated on completed training like the chat path; the result may be
/// shorter than requested.
pub async fn get_feed(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<ApiResponse<Vec<RecommendedItem>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state
        .repo
        .get_session(user_id)
        .await?
        .ok_or(AppError::Repository(
            pulsefeed_types::error::RepositoryError::NotFound,
        ))?;

    if !session.training_state.feed_access() {
        return Err(AppError::Feed(FeedError::NotEligible(
            session.training_state.to_string(),
        )));
    }

    let count = query.count.unwrap_or(state.config.feed.default_count);
    let items = state
        .orchestrator
        .get_feed(FeedRequest::new(user_id, count))
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(items, request_id, elapsed)))
}
