//! Unlock-secret hashing.
//!
//! The holder's unlock secret is stored only as a salted Argon2id PHC string;
//! the raw secret never touches disk. Verification re-runs the hash.

use crate::error::{CryptoError, CryptoResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash an unlock secret into a self-describing PHC string.
pub fn hash_unlock_secret(secret: &str) -> CryptoResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| CryptoError::SecretHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify an unlock secret against a stored PHC hash.
pub fn verify_unlock_secret(secret: &str, phc: &str) -> CryptoResult<bool> {
    let parsed = PasswordHash::new(phc).map_err(|e| CryptoError::SecretHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}
