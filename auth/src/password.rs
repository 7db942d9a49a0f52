//! Credential hashing using Argon2id.
//!
//! Hashes are stored as PHC strings, so the algorithm, parameters and salt
//! travel with the hash and old hashes keep verifying if defaults change.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use eventhub_core::{EventHubError, Result};

/// Turns plaintext passwords into stored credential hashes and back.
///
/// The account service is generic over this so tests can swap in a cheap
/// implementation.
pub trait CredentialHasher: Send + Sync {
    /// Hash `password` with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`EventHubError::Storage`] if hashing fails.
    fn hash(&self, password: &str) -> Result<String>;

    /// Check `password` against a stored hash.
    ///
    /// Returns `Ok(false)` on mismatch.
    ///
    /// # Errors
    ///
    /// Returns [`EventHubError::Storage`] if the stored hash is malformed.
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// Argon2id with the crate's default parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    /// Create a hasher with default parameters.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| EventHubError::Storage(format!("password hashing failed: {e}")))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| EventHubError::Storage(format!("invalid hash format: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(EventHubError::Storage(format!("verify error: {e}"))),
        }
    }
}
