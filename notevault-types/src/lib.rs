//! Core data types for NoteVault.
//!
//! Shared by the crypto and store crates: note identifiers, the encryption
//! policy enum, note/version records, and the write-payload type that the
//! policy engine dispatches on.

mod id;
mod note;
mod policy;

pub use id::NoteId;
pub use note::{AppendEvent, NewNote, NoteRecord, VersionRecord, VersionSummary, WritePayload};
pub use policy::{EncryptionPolicy, PolicyParseError};

/// Nonce length for ChaCha20-Poly1305 (bytes).
pub const NONCE_SIZE: usize = 12;
