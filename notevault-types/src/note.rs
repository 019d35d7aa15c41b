//! Note metadata and version records.

use crate::{EncryptionPolicy, NoteId, NONCE_SIZE};
use serde::{Deserialize, Serialize};

/// Note metadata, owned by the metadata index.
///
/// The id is immutable once assigned. Metadata fields (title, tags, summary)
/// are mutable through patch operations; content lives in version records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: NoteId,
    pub title: String,
    pub note_type: String,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub created_at: i64,
    pub modified_at: i64,
}

/// One immutable, timestamped, encrypted snapshot of a note's content.
///
/// Versions are totally ordered by `created_at`, with `seq` breaking ties
/// under rapid same-millisecond writes. Once written a record is never
/// mutated in place; edits append a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    pub note_id: NoteId,
    /// Per-note monotonic sequence counter (ordering tiebreak).
    pub seq: i64,
    pub created_at: i64,
    pub policy: EncryptionPolicy,
    /// Fresh per encryption operation; never reused under the same key.
    pub nonce: [u8; NONCE_SIZE],
    /// Compressed-then-encrypted bytes, authentication tag appended.
    pub ciphertext: Vec<u8>,
    /// Hex SHA-256 of the stored ciphertext, computed post-encryption.
    pub checksum: String,
    /// Opaque, policy-defined; never treated as secret.
    pub aux_meta: serde_json::Value,
}

/// Metadata-only listing row — servable without any key or decryption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSummary {
    pub seq: i64,
    pub created_at: i64,
    pub policy: EncryptionPolicy,
    pub checksum: String,
    pub aux_meta: serde_json::Value,
}

/// Content submitted with a write request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WritePayload {
    /// Server-side encryption requested (server-assisted policy only).
    Plaintext(Vec<u8>),
    /// Client-encrypted bytes, accepted opaquely.
    Encrypted {
        ciphertext: Vec<u8>,
        nonce: [u8; NONCE_SIZE],
    },
}

/// Request to create a note with its first version.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub title: String,
    pub note_type: String,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    /// Falls back to the configured default policy when absent.
    pub policy: Option<EncryptionPolicy>,
    pub payload: WritePayload,
}

/// Audit event emitted after every successful version append.
///
/// Carries the resolved policy and ciphertext checksum — never plaintext,
/// never key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendEvent {
    pub note_id: NoteId,
    pub seq: i64,
    pub created_at: i64,
    pub policy: EncryptionPolicy,
    pub checksum: String,
}
