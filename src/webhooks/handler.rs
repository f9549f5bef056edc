//! Milestone event processing: parse, render, notify

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use super::body::BodyError;
use super::event::{MalformedEventError, MilestoneEvent};
use super::format::NotificationMessage;
use super::notifier::{NotificationDeliveryError, Notifier};

/// Webhook error types
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Invalid or missing signature
    #[error("Invalid or missing webhook signature")]
    AuthenticationDenied,

    /// The body could not be buffered
    #[error(transparent)]
    Body(#[from] BodyError),

    /// Authenticated payload is not a milestone event
    #[error(transparent)]
    MalformedEvent(#[from] MalformedEventError),

    /// Milestone payloads must be sent as JSON
    #[error("Unsupported content type: {0}")]
    UnsupportedMediaType(String),

    /// The chat service did not take the message
    #[error("Failed to deliver notification: {0}")]
    NotificationDelivery(#[from] NotificationDeliveryError),
}

impl WebhookError {
    /// HTTP status reported to GitHub for this error
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::AuthenticationDenied => StatusCode::FORBIDDEN,
            WebhookError::Body(BodyError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            WebhookError::Body(_) => StatusCode::BAD_REQUEST,
            WebhookError::MalformedEvent(_) => StatusCode::BAD_REQUEST,
            WebhookError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            WebhookError::NotificationDelivery(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
struct WebhookErrorResponse {
    error: String,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let body = Json(WebhookErrorResponse {
            error: self.to_string(),
        });

        (self.status(), body).into_response()
    }
}

/// Result type for webhook operations
pub type WebhookResult<T> = Result<T, WebhookError>;

/// Turns authenticated milestone payloads into chat messages
#[derive(Clone)]
pub struct WebhookHandler {
    channel_id: String,
    notifier: Arc<dyn Notifier>,
}

impl WebhookHandler {
    /// Create a handler posting to `channel_id` through `notifier`
    pub fn new(channel_id: impl Into<String>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            channel_id: channel_id.into(),
            notifier,
        }
    }

    /// Process an authenticated milestone body.
    ///
    /// Nothing is sent when parsing fails. A delivery failure fails the whole call.
    pub async fn handle(&self, body: &[u8]) -> WebhookResult<NotificationMessage> {
        let event = MilestoneEvent::parse(body)?;

        tracing::info!(
            action = %event.action,
            repository = %event.repository.full_name,
            milestone = %event.milestone.title,
            "Received milestone event"
        );

        let message = NotificationMessage::for_event(&self.channel_id, &event);
        self.notifier.notify(&message).await?;

        Ok(message)
    }
}

impl std::fmt::Debug for WebhookHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookHandler")
            .field("channel_id", &self.channel_id)
            .finish_non_exhaustive()
    }
}
