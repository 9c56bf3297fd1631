//! Slack request signing (`v0` HMAC-SHA256 scheme).

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::VerificationError;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

const VERSION: &str = "v0";
/// Requests older (or newer) than this are rejected as replays.
pub const MAX_SKEW_SECS: i64 = 60 * 5;

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, VerificationError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| VerificationError::InvalidSecret)?;
    mac.update(VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Ok(mac)
}

/// Compute the `X-Slack-Signature` value for a request.
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> Result<String, VerificationError> {
    let digest = mac(secret, timestamp, body)?.finalize().into_bytes();
    Ok(format!("{VERSION}={}", hex::encode(digest)))
}

/// Check a request's signature and timestamp against `now` (unix seconds).
pub fn verify(
    secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now: i64,
) -> Result<(), VerificationError> {
    let sent_at: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| VerificationError::InvalidTimestamp(timestamp.to_string()))?;
    let skew = now.abs_diff(sent_at);
    if skew > MAX_SKEW_SECS.unsigned_abs() {
        return Err(VerificationError::StaleTimestamp { skew });
    }

    let provided = signature
        .strip_prefix("v0=")
        .and_then(|hex_digest| hex::decode(hex_digest).ok())
        .ok_or(VerificationError::Mismatch)?;

    mac(secret, timestamp, body)?
        .verify_slice(&provided)
        .map_err(|_| VerificationError::Mismatch)
}
