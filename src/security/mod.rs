//! Security module for bazaar.
//!
//! Provides:
//! - **Password**: bcrypt / Argon2 / plaintext verification for the moderator login
//! - **Session**: HMAC-SHA256 signed, expiring moderator session tokens
//! - **Secrets**: startup checks that refuse placeholder signing keys in production
//!
//! Capability tokens for listing owners live in the `bazaar-token` crate.

pub mod password;
pub mod secrets;
pub mod session;

pub use secrets::{StartupError, resolve_secret};
pub use session::{IssuedSession, SessionSigner};
