//! HMAC key material.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum key length, in bytes, that is not considered a placeholder.
pub const MIN_SECRET_LEN: usize = 16;

/// Values shipped in sample configs that must never reach production.
const PLACEHOLDERS: &[&str] = &["changeme", "default", "please-change", "your-secret-here"];

/// A signing key that is wiped from memory when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Wrap the given key material.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    /// Raw key bytes for the MAC.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns `true` if the key looks like an unset or sample value.
    ///
    /// Empty keys, keys shorter than [`MIN_SECRET_LEN`] and anything
    /// containing a known placeholder word all count.
    pub fn is_placeholder(&self) -> bool {
        if self.0.len() < MIN_SECRET_LEN {
            return true;
        }
        let lowered = String::from_utf8_lossy(&self.0).to_ascii_lowercase();
        PLACEHOLDERS.iter().any(|p| lowered.contains(p))
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print actual content
        f.debug_struct("SigningSecret")
            .field("len", &self.0.len())
            .finish()
    }
}
