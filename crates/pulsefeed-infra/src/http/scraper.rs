//! HTTP client for the scrape worker service.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pulsefeed_core::scrape::ScrapeWorker;
use pulsefeed_types::config::ScraperConfig;
use pulsefeed_types::error::ScrapeError;
use pulsefeed_types::message::MediaKind;
use pulsefeed_types::scrape::ScrapeOutcome;

/// Client for the worker that pulls channel content into the content
/// store. A scrape call blocks until the worker has finished ingesting,
/// so the request timeout here is the long one.
pub struct HttpScrapeWorker {
    base_url: String,
    http: reqwest::Client,
}

impl HttpScrapeWorker {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http: super::build_client(config.timeout_secs),
        }
    }
}

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    channel_username: &'a str,
    limit: u32,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    success: bool,
    #[serde(default)]
    posts_count: u32,
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct JoinRequest<'a> {
    channel_username: &'a str,
}

impl ScrapeWorker for HttpScrapeWorker {
    async fn scrape(&self, channel: &str, limit: u32) -> Result<ScrapeOutcome, ScrapeError> {
        let url = format!("{}/cmd/scrape", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&ScrapeRequest {
                channel_username: channel,
                limit,
            })
            .send()
            .await
            .map_err(|e| ScrapeError::Unavailable(e.to_string()))?;

        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return Err(ScrapeError::Unavailable("worker not connected".to_string()));
        }
        let body: ScrapeResponse = response
            .error_for_status()
            .map_err(|e| ScrapeError::Unavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| ScrapeError::Unavailable(e.to_string()))?;

        if !body.success {
            debug!(channel, reason = %body.message, "scrape rejected by worker");
            return Err(ScrapeError::ChannelRejected(
                channel.to_string(),
                body.message,
            ));
        }

        debug!(channel, items = body.posts_count, "scrape finished");
        Ok(ScrapeOutcome {
            items_ingested: body.posts_count,
        })
    }

    async fn join(&self, channel: &str) -> Result<(), ScrapeError> {
        let url = format!("{}/cmd/join", self.base_url);

        self.http
            .post(&url)
            .json(&JoinRequest {
                channel_username: channel,
            })
            .send()
            .await
            .map_err(|e| ScrapeError::Unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| ScrapeError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn fetch_media(
        &self,
        channel: &str,
        media_id: i64,
        kind: MediaKind,
    ) -> Result<Option<Vec<u8>>, ScrapeError> {
        let url = format!("{}/media/{kind}", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("channel_username", channel),
                ("message_id", &media_id.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ScrapeError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::SERVICE_UNAVAILABLE => {
                Err(ScrapeError::Unavailable("worker not connected".to_string()))
            }
            _ => {
                let bytes = response
                    .error_for_status()
                    .map_err(|e| ScrapeError::Unavailable(e.to_string()))?
                    .bytes()
                    .await
                    .map_err(|e| ScrapeError::Unavailable(e.to_string()))?;
                Ok(Some(bytes.to_vec()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_response_deserialization() {
        let json = r#"{
            "success": true,
            "channel_username": "durov",
            "posts_count": 7,
            "message": "ok"
        }"#;

        let body: ScrapeResponse = serde_json::from_str(json).unwrap();
        assert!(body.success);
        assert_eq!(body.posts_count, 7);
    }

    #[test]
    fn scrape_response_failure_shape() {
        let json = r#"{"success": false, "message": "channel is private"}"#;
        let body: ScrapeResponse = serde_json::from_str(json).unwrap();
        assert!(!body.success);
        assert_eq!(body.posts_count, 0);
        assert_eq!(body.message, "channel is private");
    }

    #[test]
    fn scrape_request_serialization() {
        let req = ScrapeRequest {
            channel_username: "durov",
            limit: 7,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["channel_username"], "durov");
        assert_eq!(json["limit"], 7);
    }

    #[test]
    fn media_url_uses_kind_segment() {
        assert_eq!(MediaKind::Photo.to_string(), "photo");
    }
}
