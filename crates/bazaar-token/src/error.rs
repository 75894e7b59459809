//! Error types for token validation.

use thiserror::Error;

/// Reasons a capability token is rejected.
///
/// Every variant renders the same `Display` text. Callers that surface an
/// error to a client can print it verbatim without telling an attacker which
/// check failed. Use [`TokenError::reason`] for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Bad base64, bad UTF-8, wrong number of fields or a non-canonical number.
    #[error("invalid or expired link")]
    Malformed,

    /// The embedded tag does not match the recomputed one.
    #[error("invalid or expired link")]
    BadSignature,

    /// Older than the validity window.
    #[error("invalid or expired link")]
    Expired,

    /// Minted further in the future than the tolerated clock skew.
    #[error("invalid or expired link")]
    IssuedInFuture,
}

impl TokenError {
    /// Static label for metrics and structured logs.
    #[inline]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::BadSignature => "bad_signature",
            Self::Expired => "expired",
            Self::IssuedInFuture => "issued_in_future",
        }
    }
}
