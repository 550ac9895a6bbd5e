//! HTTP client for the chat bridge.
//!
//! The bridge fronts the upstream chat protocol; this client only sends
//! messages and retracts them by handle. Photos travel base64-encoded in
//! the send payload.

use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pulsefeed_core::messaging::ChatTransport;
use pulsefeed_types::config::TransportConfig;
use pulsefeed_types::error::TransportError;
use pulsefeed_types::message::{MessageContent, MessageHandle};

/// Client for the outbound chat bridge.
pub struct HttpChatTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpChatTransport {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http: super::build_client(config.timeout_secs),
        }
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    user_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_b64: Option<String>,
}

#[derive(Deserialize)]
struct SendResponse {
    message_id: i64,
}

#[derive(Serialize)]
struct RetractRequest {
    user_id: i64,
    message_id: i64,
}

impl ChatTransport for HttpChatTransport {
    async fn send(
        &self,
        user_id: i64,
        content: &MessageContent,
    ) -> Result<MessageHandle, TransportError> {
        let url = format!("{}/send", self.base_url);

        let payload = SendRequest {
            user_id,
            text: &content.text,
            photo_b64: content
                .photo
                .as_deref()
                .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes)),
        };

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        if response.status().is_client_error() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected(format!("{status}: {detail}")));
        }

        let body: SendResponse = response
            .error_for_status()
            .map_err(|e| TransportError::Unavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        debug!(user_id, message_id = body.message_id, "message delivered");
        Ok(MessageHandle(body.message_id))
    }

    async fn edit_or_delete(
        &self,
        user_id: i64,
        handle: MessageHandle,
    ) -> Result<(), TransportError> {
        let url = format!("{}/retract", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&RetractRequest {
                user_id,
                message_id: handle.0,
            })
            .send()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        match response.status() {
            // Already deleted upstream; the registry treats this as done.
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(TransportError::MessageGone),
            status if status.is_client_error() => {
                let detail = response.text().await.unwrap_or_default();
                Err(TransportError::Rejected(format!("{status}: {detail}")))
            }
            _ => {
                response
                    .error_for_status()
                    .map_err(|e| TransportError::Unavailable(e.to_string()))?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_request_omits_photo_when_absent() {
        let req = SendRequest {
            user_id: 42,
            text: "hello",
            photo_b64: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["user_id"], 42);
        assert_eq!(json["text"], "hello");
        assert!(json.get("photo_b64").is_none());
    }

    #[test]
    fn send_request_encodes_photo() {
        let content = MessageContent {
            text: "pic".to_string(),
            photo: Some(vec![0xDE, 0xAD]),
        };
        let req = SendRequest {
            user_id: 1,
            text: &content.text,
            photo_b64: content
                .photo
                .as_deref()
                .map(|b| base64::engine::general_purpose::STANDARD.encode(b)),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["photo_b64"], "3q0=");
    }

    #[test]
    fn send_response_deserialization() {
        let body: SendResponse = serde_json::from_str(r#"{"message_id": 9001}"#).unwrap();
        assert_eq!(body.message_id, 9001);
    }
}
