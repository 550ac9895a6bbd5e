//! HTTP client for the recommendation oracle service.

use serde::{Deserialize, Serialize};
use tracing::debug;

use pulsefeed_core::feed::RecommendationOracle;
use pulsefeed_types::config::OracleConfig;
use pulsefeed_types::error::OracleError;
use pulsefeed_types::feed::RecommendedItem;

/// Client for the ranking service's recommendation endpoint.
///
/// The oracle ranks over whatever the content store currently holds; an
/// empty or short result is a normal response, not an error.
pub struct HttpRecommendationOracle {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRecommendationOracle {
    pub fn new(config: &OracleConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http: super::build_client(config.timeout_secs),
        }
    }
}

#[derive(Serialize)]
struct RecommendRequest {
    user_telegram_id: i64,
    limit: usize,
    exclude_interacted: bool,
}

#[derive(Deserialize)]
struct RecommendResponse {
    #[serde(default)]
    recommendations: Vec<RecommendedItem>,
}

impl RecommendationOracle for HttpRecommendationOracle {
    async fn recommend(
        &self,
        user_id: i64,
        count: usize,
    ) -> Result<Vec<RecommendedItem>, OracleError> {
        let url = format!("{}/api/v1/ml/recommendations", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&RecommendRequest {
                user_telegram_id: user_id,
                limit: count,
                exclude_interacted: true,
            })
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;

        let body: RecommendResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;

        debug!(
            user_id,
            requested = count,
            returned = body.recommendations.len(),
            "oracle query resolved"
        );
        Ok(body.recommendations)
    }
}
