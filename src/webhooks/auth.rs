//! Webhook authentication guard
//!
//! Decides whether a delivery may proceed by checking its `X-Hub-Signature`
//! against the raw body. The guard never interprets the body as JSON.

use axum::http::HeaderMap;

use super::body::{BodyError, ReplayableBody};
use super::server::DELIVERY_HEADER;
use super::signature::{SignatureVerifier, SIGNATURE_HEADER};

/// Outcome of authenticating a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    /// Signature matches; the request may be parsed.
    Allow,
    /// Signature missing, malformed or wrong; stop processing.
    Deny,
}

impl AuthResult {
    /// Whether the delivery may proceed
    pub fn is_allowed(self) -> bool {
        matches!(self, AuthResult::Allow)
    }
}

/// Reason logged when a delivery is denied
fn deny_reason(signature: Option<&str>) -> &'static str {
    match signature {
        None => "missing signature",
        Some(_) => "signature mismatch",
    }
}

/// Checks GitHub signatures against the configured secret
#[derive(Debug, Clone)]
pub struct WebhookAuthenticator {
    verifier: SignatureVerifier,
}

impl WebhookAuthenticator {
    /// Create an authenticator for the given webhook secret
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            verifier: SignatureVerifier::new(secret),
        }
    }

    /// Authenticate a delivery.
    ///
    /// A missing or non-ASCII signature header counts as absent. Errors are
    /// only returned when the body itself cannot be read.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        body: &ReplayableBody,
    ) -> Result<AuthResult, BodyError> {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());

        let raw = body.bytes().await?;

        if self.verifier.check(signature, &raw) {
            Ok(AuthResult::Allow)
        } else {
            tracing::warn!(
                delivery = headers.get(DELIVERY_HEADER).and_then(|v| v.to_str().ok()),
                reason = deny_reason(signature),
                body_len = raw.len(),
                "Denied webhook delivery"
            );
            Ok(AuthResult::Deny)
        }
    }
}
