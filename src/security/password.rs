//! Password hashing and verification utilities.
//!
//! Centralizes password handling for the moderator login. Stored passwords
//! may be bcrypt hashes (`$2…`), Argon2 PHC strings (`$argon2…`) or, for
//! local setups, plaintext.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use subtle::ConstantTimeEq;

/// Verify a password against the stored value (hash or plaintext).
pub fn verify(password: &str, stored: &str) -> bool {
    if stored.starts_with("$2") {
        bcrypt::verify(password, stored).unwrap_or(false)
    } else if stored.starts_with("$argon2") {
        match PasswordHash::new(stored) {
            Ok(hash) => Argon2::default()
                .verify_password(password.as_bytes(), &hash)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored admin password is not a valid Argon2 hash");
                false
            }
        }
    } else {
        // Plaintext fallback, compared without early exit
        password.as_bytes().ct_eq(stored.as_bytes()).into()
    }
}

/// Returns `true` if `stored` looks like a bcrypt or Argon2 hash.
pub fn is_hashed(stored: &str) -> bool {
    stored.starts_with("$2") || stored.starts_with("$argon2")
}

/// Hash a password using default Argon2 settings.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    Ok(argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argon2_roundtrip() {
        let hash = hash_password("moderator-pass").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(is_hashed(&hash));
        assert!(verify("moderator-pass", &hash));
        assert!(!verify("wrong-pass", &hash));
    }

    #[test]
    fn test_bcrypt_hash() {
        let hash = bcrypt::hash("moderator-pass", 4).unwrap();
        assert!(is_hashed(&hash));
        assert!(verify("moderator-pass", &hash));
        assert!(!verify("wrong-pass", &hash));
    }

    #[test]
    fn test_plaintext_fallback() {
        assert!(!is_hashed("plain-password"));
        assert!(verify("plain-password", "plain-password"));
        assert!(!verify("plain-passwor", "plain-password"));
        assert!(!verify("", "plain-password"));
    }

    #[test]
    fn test_corrupt_argon2_rejects() {
        assert!(!verify("anything", "$argon2id$garbage"));
    }
}
