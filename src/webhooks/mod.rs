//! GitHub milestone webhooks
//!
//! Request flow: the signature guard ([`auth`]) buffers the body ([`body`])
//! and verifies it ([`signature`]); the handler then parses the same bytes
//! ([`event`]), renders them ([`format`]) and posts the result ([`notifier`]).

pub mod auth;
pub mod body;
pub mod event;
pub mod format;
pub mod handler;
pub mod notifier;
pub mod server;
pub mod signature;

pub use auth::{AuthResult, WebhookAuthenticator};
pub use body::{BodyError, BodySource, ReplayableBody};
pub use event::{Action, ChangeProperty, Changes, MalformedEventError, MilestoneEvent};
pub use format::NotificationMessage;
pub use handler::{WebhookError, WebhookHandler, WebhookResult};
pub use notifier::{NotificationDeliveryError, Notifier, SlackNotifier};
pub use server::{create_webhook_router, health_handler, AppState};
pub use signature::SignatureVerifier;
