//! Admin session codec: an HMAC-signed cookie value carrying its own claims,
//! not just an opaque id into a server-side session table. There is no
//! database to back one (the core's Non-goals exclude persistent stores),
//! so the cookie itself is the session.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The admin cookie's payload, once decoded and signature-verified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminSessionClaims {
    /// The allowlisted email this admin session was issued for.
    pub email: String,
    /// Unix timestamp the session was issued at.
    pub issued_at: i64,
    /// Unix timestamp the session expires at.
    pub expires_at: i64,
}

impl AdminSessionClaims {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at
    }
}

/// Encode and HMAC-sign an admin session cookie value. `ttl_seconds` has
/// already been clamped to `[60, 3600]` by `ApplicationConfig::load`.
#[must_use]
pub fn encode(secret: &[u8], email: &str, ttl_seconds: i64, now: DateTime<Utc>) -> String {
    let claims = AdminSessionClaims { email: email.to_string(), issued_at: now.timestamp(), expires_at: now.timestamp() + ttl_seconds };
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).expect("AdminSessionClaims always serializes"));
    let signature = sign(secret, &payload);
    format!("{payload}.{signature}")
}

/// Verify and decode a cookie value produced by `encode`. Returns `None` on
/// any signature mismatch, malformed payload, or expiry — callers treat all
/// of those identically (not authenticated), never distinguishing the
/// reason in a way that leaks to the caller.
#[must_use]
pub fn decode(secret: &[u8], cookie_value: &str, now: DateTime<Utc>) -> Option<AdminSessionClaims> {
    let (payload, signature) = cookie_value.split_once('.')?;
    let expected = sign(secret, payload);
    if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: AdminSessionClaims = serde_json::from_slice(&bytes).ok()?;
    if claims.is_expired(now) {
        return None;
    }
    Some(claims)
}

fn sign(secret: &[u8], payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_round_trips_the_email() {
        let now = Utc::now();
        let cookie = encode(b"secret", "admin@example.com", 3600, now);
        let claims = decode(b"secret", &cookie, now).unwrap();
        assert_eq!(claims.email, "admin@example.com");
    }

    #[test]
    fn decode_rejects_a_tampered_signature() {
        let now = Utc::now();
        let mut cookie = encode(b"secret", "admin@example.com", 3600, now);
        cookie.push('x');
        assert!(decode(b"secret", &cookie, now).is_none());
    }

    #[test]
    fn decode_rejects_the_wrong_key() {
        let now = Utc::now();
        let cookie = encode(b"secret", "admin@example.com", 3600, now);
        assert!(decode(b"different-secret", &cookie, now).is_none());
    }

    #[test]
    fn decode_rejects_an_expired_session() {
        let now = Utc::now();
        let cookie = encode(b"secret", "admin@example.com", 60, now);
        let later = now + chrono::Duration::seconds(61);
        assert!(decode(b"secret", &cookie, later).is_none());
    }

    #[test]
    fn decode_rejects_malformed_input() {
        let now = Utc::now();
        assert!(decode(b"secret", "not-a-valid-cookie", now).is_none());
        assert!(decode(b"secret", "", now).is_none());
    }
}
