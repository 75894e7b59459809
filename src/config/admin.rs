//! Moderator credentials and session configuration.

use serde::Deserialize;
use std::time::Duration;

/// Moderator login configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Password (bcrypt hash, argon2 PHC string, or plaintext).
    pub password: String,
    /// Secret key for HMAC-signed admin sessions.
    pub session_secret: Option<String>,
    /// Session lifetime in seconds (default: 12 hours).
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

impl AdminConfig {
    /// Returns `true` if the stored password is not a recognised hash.
    pub fn is_plaintext(&self) -> bool {
        !crate::security::password::is_hashed(&self.password)
    }

    /// Session lifetime.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

fn default_session_ttl_secs() -> u64 {
    12 * 60 * 60
}
