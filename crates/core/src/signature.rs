//! Webhook signature verification (HubSpot request signatures, v3).
//!
//! The signed source string is `METHOD + URI + BODY + TIMESTAMP`, hashed with
//! HMAC-SHA256 under the app's client secret and base64-encoded. Comparison
//! goes through [`Mac::verify_slice`], which is constant time.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Requests older (or newer) than this are rejected as replays.
pub const MAX_TIMESTAMP_SKEW_MS: u64 = 5 * 60 * 1000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingSignature,

    #[error("missing timestamp header")]
    MissingTimestamp,

    #[error("timestamp is not a millisecond epoch value")]
    InvalidTimestamp,

    #[error("timestamp outside the accepted window")]
    StaleTimestamp,

    #[error("signature mismatch")]
    Mismatch,
}

/// The parts of an inbound request covered by the signature.
#[derive(Debug, Clone, Copy)]
pub struct SignedRequest<'a> {
    pub method: &'a str,
    pub uri: &'a str,
    pub body: &'a str,
    pub timestamp: &'a str,
}

impl SignedRequest<'_> {
    fn mac(&self, secret: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::Mismatch)?;
        mac.update(self.method.to_uppercase().as_bytes());
        mac.update(self.uri.as_bytes());
        mac.update(self.body.as_bytes());
        mac.update(self.timestamp.as_bytes());
        Ok(mac)
    }
}

/// Compute the base64 v3 signature for a request.
pub fn sign_v3(secret: &[u8], request: &SignedRequest<'_>) -> Result<String, SignatureError> {
    let mac = request.mac(secret)?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify a v3 signature and its timestamp window.
///
/// `now_ms` is the current time in milliseconds since the Unix epoch.
pub fn verify_v3(
    secret: &[u8],
    request: &SignedRequest<'_>,
    signature: Option<&str>,
    now_ms: i64,
) -> Result<(), SignatureError> {
    let signature = signature
        .filter(|s| !s.is_empty())
        .ok_or(SignatureError::MissingSignature)?;
    if request.timestamp.is_empty() {
        return Err(SignatureError::MissingTimestamp);
    }

    let sent_at: i64 = request
        .timestamp
        .trim()
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;
    if now_ms.abs_diff(sent_at) > MAX_TIMESTAMP_SKEW_MS {
        return Err(SignatureError::StaleTimestamp);
    }

    let expected = STANDARD
        .decode(signature.trim())
        .map_err(|_| SignatureError::Mismatch)?;
    request
        .mac(secret)?
        .verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}
