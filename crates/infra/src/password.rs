//! # Password hashing
//!
//! Argon2id hashing and verification, OWASP parameters (RFC 9106
//! low-memory profile): 64 MB, 1 iteration, parallelism 1.

use argon2::{
    Argon2,
    Params,
    PasswordVerifier as _,
    password_hash::{PasswordHash, PasswordHasher as _, SaltString, rand_core::OsRng},
};

use crate::InfraError;

/// Password hashing and verification.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password with a fresh random salt.
    fn hash(&self, password: &str) -> Result<String, InfraError>;

    /// Verifies a plaintext password against a stored hash.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed stored hash; a wrong password
    /// is `Ok(false)`.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, InfraError>;
}

/// Argon2id implementation.
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        let params = Params::new(
            65536, // memory (KiB) = 64 MB
            1,     // iterations
            1,     // parallelism
            None,  // output length (default 32)
        )
        .expect("static Argon2 params are valid");

        Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        }
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> Result<String, InfraError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| InfraError::unexpected(format!("password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, InfraError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| InfraError::unexpected(format!("malformed password hash: {e}")))?;

        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify_round_trip() {
        let hasher = Argon2PasswordHasher::new();
        let hash = hasher.hash("secret123").unwrap();

        assert!(hasher.verify("secret123", &hash).unwrap());
        assert!(!hasher.verify("wrong", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = Argon2PasswordHasher::new();
        let first = hasher.hash("secret123").unwrap();
        let second = hasher.hash("secret123").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let hasher = Argon2PasswordHasher::new();
        assert!(hasher.verify("secret123", "not-a-hash").is_err());
    }
}
