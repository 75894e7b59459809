//! Moderator session tokens.
//!
//! A session token is `base64url_nopad(expires_at_millis_be ‖ HMAC-SHA256)`.
//! The MAC input is prefixed with a fixed label so a session can never be
//! mistaken for a capability link, even if both keys were the same.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bazaar_token::SigningSecret;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const SESSION_LABEL: &[u8] = b"bazaar-admin-session:";
const EXPIRY_LEN: usize = 8;
const TAG_LEN: usize = 32;

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Bearer token for the `Authorization` header.
    pub token: String,
    /// Expiry in epoch milliseconds.
    pub expires_at_millis: i64,
}

/// Issues and checks moderator sessions.
#[derive(Debug, Clone)]
pub struct SessionSigner {
    secret: SigningSecret,
    ttl: Duration,
}

impl SessionSigner {
    /// Create a signer with the given key and session lifetime.
    pub fn new(secret: SigningSecret, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    /// Issue a session starting now.
    pub fn issue(&self) -> IssuedSession {
        self.issue_at(chrono::Utc::now().timestamp_millis())
    }

    /// Issue a session starting at `now_millis`.
    pub fn issue_at(&self, now_millis: i64) -> IssuedSession {
        let ttl_millis = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at_millis = now_millis.saturating_add(ttl_millis);

        let mut payload = Vec::with_capacity(EXPIRY_LEN + TAG_LEN);
        payload.extend_from_slice(&expires_at_millis.to_be_bytes());
        payload.extend_from_slice(&self.tag(expires_at_millis));

        IssuedSession {
            token: URL_SAFE_NO_PAD.encode(payload),
            expires_at_millis,
        }
    }

    /// Check a session token against the current time.
    pub fn verify(&self, token: &str) -> bool {
        self.verify_at(token, chrono::Utc::now().timestamp_millis())
    }

    /// Check a session token as of `now_millis`.
    pub fn verify_at(&self, token: &str, now_millis: i64) -> bool {
        let Ok(payload) = URL_SAFE_NO_PAD.decode(token) else {
            return false;
        };
        if payload.len() != EXPIRY_LEN + TAG_LEN {
            return false;
        }

        let (expiry, tag) = payload.split_at(EXPIRY_LEN);
        let mut expiry_bytes = [0u8; EXPIRY_LEN];
        expiry_bytes.copy_from_slice(expiry);
        let expires_at_millis = i64::from_be_bytes(expiry_bytes);

        let authentic: bool = self.tag(expires_at_millis)[..].ct_eq(tag).into();
        authentic && now_millis < expires_at_millis
    }

    fn tag(&self, expires_at_millis: i64) -> [u8; TAG_LEN] {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(SESSION_LABEL);
        mac.update(&expires_at_millis.to_be_bytes());
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000_000;

    fn signer() -> SessionSigner {
        SessionSigner::new(
            SigningSecret::new("session-secret-for-unit-tests"),
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn test_issue_then_verify() {
        let signer = signer();
        let session = signer.issue_at(NOW);
        assert_eq!(session.expires_at_millis, NOW + 3_600_000);
        assert!(signer.verify_at(&session.token, NOW));
        assert!(signer.verify_at(&session.token, NOW + 3_599_999));
    }

    #[test]
    fn test_expired_session_rejected() {
        let signer = signer();
        let session = signer.issue_at(NOW);
        assert!(!signer.verify_at(&session.token, NOW + 3_600_000));
    }

    #[test]
    fn test_extended_expiry_rejected() {
        let signer = signer();
        let session = signer.issue_at(NOW);
        let mut payload = URL_SAFE_NO_PAD.decode(&session.token).unwrap();
        payload[..EXPIRY_LEN].copy_from_slice(&(NOW + 86_400_000).to_be_bytes());
        let forged = URL_SAFE_NO_PAD.encode(payload);
        assert!(!signer.verify_at(&forged, NOW + 3_600_001));
    }

    #[test]
    fn test_other_key_rejected() {
        let session = signer().issue_at(NOW);
        let other = SessionSigner::new(
            SigningSecret::new("a-different-session-secret-xyz"),
            Duration::from_secs(3600),
        );
        assert!(!other.verify_at(&session.token, NOW));
    }

    #[test]
    fn test_garbage_rejected() {
        let signer = signer();
        assert!(!signer.verify_at("", NOW));
        assert!(!signer.verify_at("not base64!", NOW));
        assert!(!signer.verify_at(&URL_SAFE_NO_PAD.encode([0u8; 12]), NOW));
    }
}
