//! Capability-token configuration.

use serde::Deserialize;
use std::time::Duration;

/// Capability-token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Secret key for HMAC-signed capability links.
    /// MUST be kept private and should be at least 32 characters.
    pub token_secret: Option<String>,
    /// Seconds a token's timestamp may run ahead of our clock (default: 300).
    #[serde(default = "default_max_clock_skew_secs")]
    pub max_clock_skew_secs: u64,
    /// Accept deletion requests that prove ownership by email instead of a
    /// token. Vulnerable to guessing; off by default.
    #[serde(default)]
    pub legacy_deletion_requests: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            token_secret: None,
            max_clock_skew_secs: default_max_clock_skew_secs(),
            legacy_deletion_requests: false,
        }
    }
}

impl SecurityConfig {
    /// Tolerated skew for future-dated tokens.
    pub fn max_clock_skew(&self) -> Duration {
        Duration::from_secs(self.max_clock_skew_secs)
    }

    /// Emit a warning when the deprecated email-based path is switched on.
    pub fn warn_deprecated(&self) {
        if self.legacy_deletion_requests {
            tracing::warn!(
                "[security].legacy_deletion_requests is enabled; email-based ownership checks are deprecated and guessable"
            );
        }
    }
}

fn default_max_clock_skew_secs() -> u64 {
    300
}
