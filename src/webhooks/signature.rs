//! GitHub webhook signatures
//!
//! GitHub signs every delivery with HMAC-SHA1 keyed by the webhook secret and
//! sends the result in the `X-Hub-Signature` header as `sha1=<hex-digest>`.

use hmac::{Hmac, Mac};
use sha1::Sha1;

/// Type alias for HMAC-SHA1
type HmacSha1 = Hmac<Sha1>;

/// Header carrying the delivery signature
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";

/// Prefix identifying the only supported algorithm
pub const SIGNATURE_PREFIX: &str = "sha1=";

/// Length in bytes of an HMAC-SHA1 digest
pub const DIGEST_LEN: usize = 20;

fn keyed_mac(secret: &[u8]) -> HmacSha1 {
    // HMAC accepts keys of any length, so this only fails if the primitive is broken.
    HmacSha1::new_from_slice(secret).expect("HMAC can take any key size")
}

/// Compute the raw HMAC-SHA1 digest of `body` keyed by `secret`.
pub fn sign(body: &[u8], secret: &[u8]) -> [u8; DIGEST_LEN] {
    let mut mac = keyed_mac(secret);
    mac.update(body);
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&mac.finalize().into_bytes());
    digest
}

/// Check a provided `X-Hub-Signature` value against `body`.
///
/// Returns `false` when the signature is absent, lacks the `sha1=` prefix,
/// is not valid hex, or does not match. The digest comparison is constant-time.
pub fn check(provided: Option<&str>, body: &[u8], secret: &[u8]) -> bool {
    let Some(hex_digest) = provided.and_then(|sig| sig.strip_prefix(SIGNATURE_PREFIX)) else {
        return false;
    };

    let provided_digest = match hex::decode(hex_digest) {
        Ok(digest) => digest,
        Err(_) => return false,
    };

    let mut mac = keyed_mac(secret);
    mac.update(body);
    mac.verify_slice(&provided_digest).is_ok()
}

/// Produce the header value GitHub would send for `body`: `sha1=<hex>`.
pub fn create(body: &[u8], secret: &[u8]) -> String {
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(sign(body, secret)))
}

/// Verifier bound to the configured webhook secret
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl SignatureVerifier {
    /// Create a verifier for the given shared secret
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// See [`check`].
    pub fn check(&self, provided: Option<&str>, body: &[u8]) -> bool {
        check(provided, body, &self.secret)
    }

    /// See [`create`].
    pub fn create(&self, body: &[u8]) -> String {
        create(body, &self.secret)
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}
