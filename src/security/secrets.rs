//! Startup checks for signing keys.
//!
//! Capability links are mailed out and stay valid for weeks, so a guessable
//! key is a standing forgery risk. In production an absent or placeholder key
//! stops the process before any listener is bound.

use bazaar_token::SigningSecret;
use rand::Rng;
use rand::distributions::Alphanumeric;
use thiserror::Error;
use tracing::warn;

use crate::config::Environment;

/// Length of generated development secrets.
const EPHEMERAL_SECRET_LEN: usize = 48;

/// Fatal misconfiguration detected at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{0} is not configured")]
    MissingSecret(&'static str),
    #[error("{0} is a placeholder or shorter than 16 bytes")]
    PlaceholderSecret(&'static str),
}

/// Turn a configured secret into a signing key.
///
/// `setting` names the config key in errors and logs. Production refuses
/// missing and placeholder values; development warns, and replaces a missing
/// value with a random per-process key.
pub fn resolve_secret(
    setting: &'static str,
    configured: Option<&str>,
    environment: Environment,
) -> Result<SigningSecret, StartupError> {
    let Some(value) = configured else {
        if environment.is_production() {
            return Err(StartupError::MissingSecret(setting));
        }
        warn!(
            setting,
            "No secret configured - using ephemeral random secret. Links and sessions will NOT survive a restart."
        );
        return Ok(ephemeral_secret());
    };

    let secret = SigningSecret::new(value);
    if secret.is_placeholder() {
        if environment.is_production() {
            return Err(StartupError::PlaceholderSecret(setting));
        }
        warn!(setting, "⚠️  INSECURE: running with a placeholder secret (development mode)");
    }
    Ok(secret)
}

fn ephemeral_secret() -> SigningSecret {
    let secret: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(EPHEMERAL_SECRET_LEN)
        .map(char::from)
        .collect();
    SigningSecret::new(secret)
}
