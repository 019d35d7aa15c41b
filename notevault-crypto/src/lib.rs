//! Encryption layer for NoteVault.
//!
//! Provides the building blocks the policy engine composes per write:
//! - Argon2id for key derivation from low-entropy secrets
//! - ChaCha20-Poly1305 for authenticated encryption
//! - Gzip compression, applied strictly before encryption
//! - Keyless SHA-256 ciphertext checksums for at-rest integrity audit
//! - Salted PHC hashing for the holder's unlock secret
//!
//! # Trust models
//!
//! Under `server-assisted` policy the server derives a master key from its
//! own secret (fixed domain salt, non-rotatable) and runs the full
//! compress-then-encrypt pipeline. Under `client-only` the payload arrives
//! pre-encrypted and none of the cipher machinery here touches it — only the
//! checksum does. `hybrid` adds an optional outer wrap with the master key.

mod checksum;
mod cipher;
mod compress;
mod error;
mod key;
mod secret;

pub use checksum::{checksum, verify};
pub use cipher::{decrypt, encrypt, EncryptedData, NONCE_SIZE, TAG_SIZE};
pub use compress::{compress, decompress};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    derive_key, generate_random_key, DerivedKey, KdfParams, Salt, KEY_SIZE, MASTER_SALT,
    SALT_SIZE, UNLOCK_SALT,
};
pub use secret::{hash_unlock_secret, verify_unlock_secret};
