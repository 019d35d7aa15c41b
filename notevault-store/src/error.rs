//! Store error types.
//!
//! Every failure either aborts a write before anything is persisted or aborts
//! a read before data is returned — partial or corrupt state is never
//! surfaced as success, and nothing is retried at this layer.

use notevault_crypto::CryptoError;
use notevault_types::NoteId;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the versioned note store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Missing or malformed request field. Rejected before any crypto work.
    #[error("invalid input: {0}")]
    InputInvalid(String),

    /// Payload kind is not admissible under the resolved policy.
    #[error("policy mismatch: {0}")]
    PolicyMismatch(String),

    /// Decrypt-time tag mismatch. Says nothing about whether the ciphertext
    /// or the key was at fault.
    #[error("cannot decrypt: authentication failed")]
    AuthenticationFailure,

    /// Decompression failed after a successful decrypt.
    #[error("corrupt compressed stream: {0}")]
    CorruptStream(String),

    #[error("note not found: {0}")]
    NoteNotFound(NoteId),

    #[error("version not found: {0} seq {1}")]
    VersionNotFound(NoteId, i64),

    #[error("unlock secret already set")]
    SecretAlreadySet,

    #[error("unlock secret verification failed")]
    SecretInvalid,

    #[error("unlock secret too short (min {0} characters)")]
    SecretTooShort(usize),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("storage error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("crypto error: {0}")]
    Crypto(String),
}

impl From<CryptoError> for StoreError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Decryption => StoreError::AuthenticationFailure,
            CryptoError::CorruptStream(s) => StoreError::CorruptStream(s),
            other => StoreError::Crypto(other.to_string()),
        }
    }
}
