//! Outbound chat notifications
//!
//! See <https://api.slack.com/messaging/sending>.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use super::format::NotificationMessage;
use crate::config::SlackConfig;

/// The chat service did not accept the message
#[derive(Debug, Error)]
pub enum NotificationDeliveryError {
    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("HTTP {status} error: {body}")]
    Status { status: u16, body: String },

    /// The service answered 2xx but reported a failure in its envelope.
    #[error("chat API rejected message: {0}")]
    Rejected(String),

    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

/// Something that can deliver a rendered message
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message`. Failures are returned as-is; there are no retries.
    async fn notify(&self, message: &NotificationMessage) -> Result<(), NotificationDeliveryError>;
}

/// Slack Web API envelope: `{"ok": false, "error": "channel_not_found"}`
#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts messages through Slack's `chat.postMessage`
pub struct SlackNotifier {
    client: Client,
    endpoint: String,
    oauth_token: String,
}

impl SlackNotifier {
    /// Create a notifier from Slack configuration
    pub fn new(config: &SlackConfig) -> Result<Self, NotificationDeliveryError> {
        let client = Client::builder()
            .user_agent(concat!("milestone-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NotificationDeliveryError::Client(e.to_string()))?;

        Ok(Self::with_client(client, config))
    }

    /// Create a notifier that reuses an existing HTTP client
    pub fn with_client(client: Client, config: &SlackConfig) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/chat.postMessage",
                config.base_api_url.trim_end_matches('/')
            ),
            oauth_token: config.oauth_token.clone(),
        }
    }

    /// URL messages are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, message: &NotificationMessage) -> Result<(), NotificationDeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.oauth_token)
            .json(message)
            .send()
            .await
            .map_err(|e| NotificationDeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NotificationDeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Slack reports most failures as 200 with `ok: false`. Bodies that are
        // not a Slack envelope are taken as success.
        let body = response
            .text()
            .await
            .map_err(|e| NotificationDeliveryError::Transport(e.to_string()))?;
        if let Ok(envelope) = serde_json::from_str::<SlackResponse>(&body) {
            if !envelope.ok {
                return Err(NotificationDeliveryError::Rejected(
                    envelope.error.unwrap_or_else(|| "unknown error".to_string()),
                ));
            }
        }

        tracing::debug!(channel = %message.channel, "Posted milestone notification");
        Ok(())
    }
}

impl std::fmt::Debug for SlackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackNotifier")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
