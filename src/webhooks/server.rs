//! Webhook server implementation
//!
//! Routes GitHub deliveries through the signature guard and into the
//! milestone handler. Ping deliveries are answered before authentication.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use super::auth::WebhookAuthenticator;
use super::body::ReplayableBody;
use super::handler::{WebhookError, WebhookHandler, WebhookResult};
use super::notifier::{NotificationDeliveryError, Notifier, SlackNotifier};
use crate::config::RelayConfig;

/// Header naming the GitHub event type
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Header carrying GitHub's delivery id
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

/// Path GitHub posts deliveries to
pub const EVENTS_PATH: &str = "/github/events";

/// Shared application state for the webhook server
#[derive(Debug, Clone)]
pub struct AppState {
    pub authenticator: WebhookAuthenticator,
    pub handler: WebhookHandler,
    /// Largest body the guard will buffer
    pub max_body_bytes: usize,
}

impl AppState {
    /// Assemble state from configuration and an explicit notifier
    pub fn new(config: &RelayConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            authenticator: WebhookAuthenticator::new(config.github.secret.as_bytes()),
            handler: WebhookHandler::new(&config.slack.channel_id, notifier),
            max_body_bytes: config.server.max_body_bytes,
        }
    }

    /// Assemble state that posts to Slack
    pub fn from_config(config: &RelayConfig) -> Result<Self, NotificationDeliveryError> {
        let notifier = SlackNotifier::new(&config.slack)?;
        Ok(Self::new(config, Arc::new(notifier)))
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Create the webhook router with all routes
pub fn create_webhook_router(state: AppState) -> Router {
    Router::new()
        .route(EVENTS_PATH, post(github_events_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate_delivery,
        ))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint handler
///
/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "milestone-relay".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn is_ping(headers: &HeaderMap) -> bool {
    header_str(headers, EVENT_HEADER) == Some("ping")
}

fn is_json(headers: &HeaderMap) -> bool {
    header_str(headers, CONTENT_TYPE.as_str())
        .and_then(|v| v.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// Signature guard for `POST /github/events`
///
/// Buffers the body into a [`ReplayableBody`], checks the signature and only
/// then lets the request through. The buffered body rides along as a request
/// extension so the handler reads the same bytes. Pings skip the check.
pub async fn authenticate_delivery(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_ping(request.headers()) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let replay = ReplayableBody::new(body, state.max_body_bytes);

    let decision = match state.authenticator.authenticate(&parts.headers, &replay).await {
        Ok(decision) => decision,
        Err(err) => return WebhookError::from(err).into_response(),
    };

    if !decision.is_allowed() {
        return WebhookError::AuthenticationDenied.into_response();
    }

    let bytes = match replay.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => return WebhookError::from(err).into_response(),
    };

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(replay);
    next.run(request).await
}

/// GitHub events endpoint handler
///
/// POST /github/events
///
/// Answers pings with `ping OK`, forwards milestone events and acknowledges
/// any other event type without processing it.
pub async fn github_events_handler(
    State(state): State<AppState>,
    request: Request,
) -> WebhookResult<Response> {
    let headers = request.headers();
    let event_type = header_str(headers, EVENT_HEADER);

    match event_type {
        Some("ping") => return Ok("ping OK".into_response()),
        Some("milestone") | None => {}
        Some(other) => {
            tracing::debug!(event_type = other, "Ignoring non-milestone event");
            return Ok((StatusCode::ACCEPTED, "ignored").into_response());
        }
    }

    if !is_json(headers) {
        let content_type = header_str(headers, CONTENT_TYPE.as_str()).unwrap_or("none");
        return Err(WebhookError::UnsupportedMediaType(content_type.to_string()));
    }

    // The guard always attaches the body to requests it lets through.
    let Some(body) = request.extensions().get::<ReplayableBody>() else {
        return Err(WebhookError::AuthenticationDenied);
    };

    let raw = body.bytes().await?;
    state.handler.handle(&raw).await?;

    Ok("ok".into_response())
}
