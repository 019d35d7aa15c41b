//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in the encryption layer.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Tag verification failure. Deliberately does not say whether the
    /// ciphertext, nonce, or key was at fault.
    #[error("cannot decrypt: authentication failed")]
    Decryption,

    #[error("compression failed: {0}")]
    Compression(String),

    /// Malformed compressed stream encountered after a successful decrypt.
    /// Distinct from [`CryptoError::Decryption`] for diagnosability.
    #[error("corrupt compressed stream: {0}")]
    CorruptStream(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("secret hashing failed: {0}")]
    SecretHash(String),
}
