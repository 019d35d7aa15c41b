//! Key derivation using Argon2id.

use crate::error::{CryptoError, CryptoResult};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Derived key length in bytes.
pub const KEY_SIZE: usize = 32;

/// Salt length in bytes.
pub const SALT_SIZE: usize = 16;

/// Fixed domain salt for the unlock-secret derivation path.
///
/// Acceptable because the secret itself is the sole source of entropy here;
/// the salt only provides domain separation, not per-secret uniqueness.
pub const UNLOCK_SALT: Salt = Salt(*b"notevault-unlck\0");

/// Fixed domain salt for the server-assisted master key.
///
/// Known gap: the master key is non-rotatable by construction. Preserved
/// deliberately rather than silently adding a rotation scheme.
pub const MASTER_SALT: Salt = Salt(*b"notevault-mastr\0");

/// Argon2id salt wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Generate a random salt from the thread-local CSPRNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// Argon2id parameters.
///
/// Argon2id is memory-hard, so these defaults slow brute-force guessing of a
/// low-entropy secret at least as much as a 100k-iteration iterated PBKDF.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory in KiB (default: 65536 = 64 MiB).
    pub memory_kib: u32,
    /// Time iterations (default: 3).
    pub iterations: u32,
    /// Parallelism degree (default: 4).
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MiB
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Fast parameters for tests — not for production secrets.
    pub fn fast_insecure() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Key wrapper with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { key: bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive a 256-bit key from a secret using Argon2id.
///
/// Deliberately slow and CPU-bound; callers on an async path should run this
/// through a blocking worker so one derivation does not stall unrelated work.
/// Fails only on invalid parameters — any non-empty secret is valid input and
/// a full-length key is always produced on success.
pub fn derive_key(secret: &str, salt: &Salt, params: &KdfParams) -> CryptoResult<DerivedKey> {
    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut out = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(secret.as_bytes(), salt.as_bytes(), &mut out)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(DerivedKey::from_bytes(out))
}

/// Generate a random 256-bit key (for tests and ephemeral use).
pub fn generate_random_key() -> DerivedKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rng().fill_bytes(&mut bytes);
    DerivedKey::from_bytes(bytes)
}
