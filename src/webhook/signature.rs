//! Webhook signature verification.
//!
//! Lark signs each callback with
//! `hex(SHA-256("{timestamp}:{request_id}:{encrypt_key}:{body}"))` and
//! sends the digest in the signature header. Verification checks the
//! replay window first, then compares digests in constant time. Pure
//! aside from reading the wall clock; no side effects.

use sha2::{Digest, Sha256};

use super::ValidationError;

/// Maximum allowed clock skew between the request timestamp and now, in
/// seconds. Anything older (or further in the future) is rejected as a
/// replay regardless of signature correctness.
pub const REPLAY_WINDOW_SECS: i64 = 300;

/// Verify an inbound request signature against the shared encrypt key.
///
/// The three header values are passed as `Option` so absence is part of
/// the contract: any missing header fails with
/// [`ValidationError::MissingHeaders`].
pub fn verify(
    signature: Option<&str>,
    timestamp: Option<&str>,
    request_id: Option<&str>,
    body: &[u8],
    encrypt_key: &str,
) -> Result<(), ValidationError> {
    verify_at(
        signature,
        timestamp,
        request_id,
        body,
        encrypt_key,
        chrono::Utc::now().timestamp(),
    )
}

/// Clock-injected form of [`verify`], used directly by tests.
pub fn verify_at(
    signature: Option<&str>,
    timestamp: Option<&str>,
    request_id: Option<&str>,
    body: &[u8],
    encrypt_key: &str,
    now: i64,
) -> Result<(), ValidationError> {
    let (Some(signature), Some(timestamp), Some(request_id)) = (signature, timestamp, request_id)
    else {
        return Err(ValidationError::MissingHeaders);
    };

    // An unparsable timestamp can never fall inside the window.
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| ValidationError::StaleTimestamp)?;
    if now.saturating_sub(ts).saturating_abs() > REPLAY_WINDOW_SECS {
        return Err(ValidationError::StaleTimestamp);
    }

    let expected = compute(timestamp, request_id, encrypt_key, body);
    if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        return Err(ValidationError::SignatureMismatch);
    }

    Ok(())
}

/// Compute the hex digest a correctly signed request would carry.
pub fn compute(timestamp: &str, request_id: &str, encrypt_key: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.as_bytes());
    hasher.update(b":");
    hasher.update(request_id.as_bytes());
    hasher.update(b":");
    hasher.update(encrypt_key.as_bytes());
    hasher.update(b":");
    hasher.update(body);
    hex::encode(hasher.finalize())
}

/// Constant-time byte comparison. Length mismatch returns early; both
/// inputs here are fixed-length hex digests, so that leaks nothing.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
