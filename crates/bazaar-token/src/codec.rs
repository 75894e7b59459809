//! Minting and validating capability tokens.
//!
//! # Wire Format
//!
//! ```text
//! base64url_nopad( "{issued_at_millis}:{hex_hmac_sha256}:{resource_id}" )
//! ```
//!
//! The MAC covers `"{resource_id}:{issued_at_millis}"`. Both numbers must be
//! canonical decimal (digits only, no sign, no leading zeros) so that every
//! distinct token string maps to a distinct signed message.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::TokenError;
use crate::secret::SigningSecret;

type HmacSha256 = Hmac<Sha256>;

/// Identifier of the resource a token acts on. Always positive.
pub type ResourceId = i64;

/// How long a token stays valid after it is minted.
pub const VALIDITY_WINDOW: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default tolerance for tokens stamped slightly ahead of our clock.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);

/// Mints and validates tokens with a single injected secret.
///
/// Immutable after construction; share it behind an `Arc` and call it from
/// any number of tasks.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    secret: SigningSecret,
    max_clock_skew: Duration,
}

impl TokenCodec {
    /// Create a codec signing with `secret`.
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            secret,
            max_clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }

    /// Set how far in the future a token's timestamp may be before it is
    /// rejected.
    pub fn with_clock_skew(mut self, max_clock_skew: Duration) -> Self {
        self.max_clock_skew = max_clock_skew;
        self
    }

    /// Tolerated clock skew for future-dated tokens.
    pub fn max_clock_skew(&self) -> Duration {
        self.max_clock_skew
    }

    /// Mint a token for `resource_id`, stamped with the current time.
    pub fn mint(&self, resource_id: ResourceId) -> String {
        self.mint_at(resource_id, now_millis())
    }

    /// Mint a token with an explicit issue time in epoch milliseconds.
    pub fn mint_at(&self, resource_id: ResourceId, issued_at_millis: i64) -> String {
        let signature = self.sign(resource_id, issued_at_millis);
        let payload = format!("{}:{}:{}", issued_at_millis, signature, resource_id);
        URL_SAFE_NO_PAD.encode(payload)
    }

    /// Validate `token` against the current time and return the resource id
    /// it was minted for.
    pub fn validate(&self, token: &str) -> Result<ResourceId, TokenError> {
        self.validate_at(token, now_millis())
    }

    /// Validate `token` as of `now_millis`.
    ///
    /// Checks run in a fixed order: structure, then signature, then
    /// freshness. A forged token never reaches the freshness check.
    pub fn validate_at(&self, token: &str, now_millis: i64) -> Result<ResourceId, TokenError> {
        let fields = Fields::decode(token)?;

        let expected = self.sign(fields.resource_id, fields.issued_at_millis);
        let matches: bool = expected
            .as_bytes()
            .ct_eq(fields.signature.as_bytes())
            .into();
        if !matches {
            return Err(TokenError::BadSignature);
        }

        let elapsed = now_millis.saturating_sub(fields.issued_at_millis);
        if elapsed > duration_millis(VALIDITY_WINDOW) {
            return Err(TokenError::Expired);
        }
        if elapsed < 0 && elapsed.saturating_neg() > duration_millis(self.max_clock_skew) {
            return Err(TokenError::IssuedInFuture);
        }

        Ok(fields.resource_id)
    }

    /// Lowercase hex HMAC-SHA256 over `"{resource_id}:{issued_at_millis}"`.
    fn sign(&self, resource_id: ResourceId, issued_at_millis: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(format!("{}:{}", resource_id, issued_at_millis).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// The three fields of a decoded, not yet authenticated token.
struct Fields {
    issued_at_millis: i64,
    signature: String,
    resource_id: ResourceId,
}

impl Fields {
    fn decode(token: &str) -> Result<Self, TokenError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| TokenError::Malformed)?;
        let text = String::from_utf8(bytes).map_err(|_| TokenError::Malformed)?;

        let mut parts = text.split(':');
        let (Some(issued_at), Some(signature), Some(resource_id), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let issued_at_millis = parse_canonical(issued_at)?;
        let resource_id = parse_canonical(resource_id)?;
        if resource_id <= 0 {
            return Err(TokenError::Malformed);
        }

        Ok(Self {
            issued_at_millis,
            signature: signature.to_string(),
            resource_id,
        })
    }
}

/// Parse a non-negative decimal with no sign and no leading zeros.
fn parse_canonical(field: &str) -> Result<i64, TokenError> {
    let canonical = !field.is_empty()
        && field.bytes().all(|b| b.is_ascii_digit())
        && (field == "0" || !field.starts_with('0'));
    if !canonical {
        return Err(TokenError::Malformed);
    }
    field.parse().map_err(|_| TokenError::Malformed)
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-for-unit-tests";
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    const T0: i64 = 1_760_000_000_000;

    fn codec() -> TokenCodec {
        TokenCodec::new(SigningSecret::new(TEST_SECRET))
    }

    fn raw(payload: &str) -> String {
        URL_SAFE_NO_PAD.encode(payload)
    }

    #[test]
    fn test_mint_then_validate() {
        let codec = codec();
        let token = codec.mint(42);
        assert_eq!(codec.validate(&token), Ok(42));
    }

    #[test]
    fn test_token_is_url_safe() {
        let token = codec().mint_at(7, T0);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert!(!token.contains('='));
    }

    #[test]
    fn test_wire_layout() {
        let token = codec().mint_at(42, T0);
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&token).unwrap()).unwrap();
        let parts: Vec<&str> = decoded.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], T0.to_string());
        assert_eq!(parts[1].len(), 64);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(parts[2], "42");
    }

    #[test]
    fn test_window_boundaries() {
        let codec = codec();
        let token = codec.mint_at(9, T0);

        assert_eq!(codec.validate_at(&token, T0 + 29 * DAY_MS), Ok(9));
        assert_eq!(codec.validate_at(&token, T0 + 30 * DAY_MS), Ok(9));
        assert_eq!(
            codec.validate_at(&token, T0 + 30 * DAY_MS + 1),
            Err(TokenError::Expired)
        );
        assert_eq!(
            codec.validate_at(&token, T0 + 31 * DAY_MS),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_future_token_within_skew_accepted() {
        let codec = codec();
        let token = codec.mint_at(5, T0 + 60_000);
        assert_eq!(codec.validate_at(&token, T0), Ok(5));
    }

    #[test]
    fn test_future_token_beyond_skew_rejected() {
        let codec = codec().with_clock_skew(Duration::from_secs(10));
        let token = codec.mint_at(5, T0 + 11_000);
        assert_eq!(
            codec.validate_at(&token, T0),
            Err(TokenError::IssuedInFuture)
        );
        assert_eq!(codec.validate_at(&token, T0 + 1_000), Ok(5));
    }

    #[test]
    fn test_garbage_inputs_are_malformed() {
        let codec = codec();
        for input in ["", "no-colons-here", "!!!", "a b c", "===="] {
            assert_eq!(
                codec.validate_at(input, T0),
                Err(TokenError::Malformed),
                "input {:?}",
                input
            );
        }
        assert_eq!(
            codec.validate_at(&raw("nocolons"), T0),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            codec.validate_at(&raw("1:2:3:4"), T0),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            codec.validate_at(&raw("abc:deadbeef:xyz"), T0),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_non_utf8_payload_is_malformed() {
        let token = URL_SAFE_NO_PAD.encode([0xff, 0xfe, b':', b'1']);
        assert_eq!(codec().validate_at(&token, T0), Err(TokenError::Malformed));
    }

    #[test]
    fn test_non_canonical_numbers_rejected() {
        let codec = codec();
        let signature = codec.sign(42, T0);

        let good = raw(&format!("{}:{}:42", T0, signature));
        assert_eq!(codec.validate_at(&good, T0), Ok(42));

        for payload in [
            format!("+{}:{}:42", T0, signature),
            format!("0{}:{}:42", T0, signature),
            format!("{}:{}:+42", T0, signature),
            format!("{}:{}:042", T0, signature),
            format!("{}:{}: 42", T0, signature),
        ] {
            assert_eq!(
                codec.validate_at(&raw(&payload), T0),
                Err(TokenError::Malformed),
                "payload {:?}",
                payload
            );
        }
    }

    #[test]
    fn test_non_positive_resource_rejected() {
        let codec = codec();
        let token = codec.mint_at(0, T0);
        assert_eq!(codec.validate_at(&token, T0), Err(TokenError::Malformed));
    }

    #[test]
    fn test_wrong_signature_rejected() {
        let codec = codec();
        let forged = raw(&format!("{}:{}:42", T0, "0".repeat(64)));
        assert_eq!(
            codec.validate_at(&forged, T0),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_uppercase_signature_rejected() {
        let codec = codec();
        let signature = codec.sign(42, T0).to_ascii_uppercase();
        let token = raw(&format!("{}:{}:42", T0, signature));
        assert_eq!(codec.validate_at(&token, T0), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_retargeted_token_rejected() {
        let codec = codec();
        let signature = codec.sign(42, T0);
        let retargeted = raw(&format!("{}:{}:43", T0, signature));
        assert_eq!(
            codec.validate_at(&retargeted, T0),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_different_secret_rejected() {
        let token = codec().mint_at(42, T0);
        let other = TokenCodec::new(SigningSecret::new("another-secret-entirely-1234"));
        assert_eq!(other.validate_at(&token, T0), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_forged_expired_token_reports_signature() {
        let codec = codec();
        let forged = raw(&format!("{}:{}:42", 1, "a".repeat(64)));
        assert_eq!(
            codec.validate_at(&forged, T0),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_huge_clock_skew_saturates() {
        // Whole seconds whose millisecond count just overflows a u64
        let skew = Duration::from_secs(u64::MAX / 1000 + 1);
        let codec = codec().with_clock_skew(skew);
        let token = codec.mint_at(42, T0 + 10_000);
        assert_eq!(codec.validate_at(&token, T0), Ok(42));

        let far_future = codec.mint_at(42, i64::MAX);
        assert_eq!(codec.validate_at(&far_future, 0), Ok(42));
    }

    #[test]
    fn test_distinct_instants_distinct_tokens() {
        let codec = codec();
        let first = codec.mint_at(42, T0);
        let second = codec.mint_at(42, T0 + 1);
        assert_ne!(first, second);
        assert_eq!(codec.validate_at(&first, T0 + 1), Ok(42));
        assert_eq!(codec.validate_at(&second, T0 + 1), Ok(42));
    }
}
