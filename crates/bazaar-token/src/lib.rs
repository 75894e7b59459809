//! # bazaar-token
//!
//! Stateless capability tokens for anonymous listing owners.
//!
//! A token authorizes its bearer to act on exactly one resource (a listing)
//! for a bounded window of time. It carries the resource id, the mint time in
//! epoch milliseconds and an HMAC-SHA256 tag over both, encoded as URL-safe
//! base64 without padding so it can be dropped straight into a query string.
//!
//! Validation is self-contained: no database lookup, no shared mutable state.
//! Whether the resource still exists is the caller's business.
//!
//! ## Quick Start
//!
//! ```rust
//! use bazaar_token::{SigningSecret, TokenCodec};
//!
//! let codec = TokenCodec::new(SigningSecret::new("an-example-secret-of-decent-length"));
//!
//! let token = codec.mint(42);
//! assert_eq!(codec.validate(&token), Ok(42));
//!
//! assert!(codec.validate("not-a-token").is_err());
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod secret;

pub use codec::{DEFAULT_CLOCK_SKEW, ResourceId, TokenCodec, VALIDITY_WINDOW};
pub use error::TokenError;
pub use secret::SigningSecret;
