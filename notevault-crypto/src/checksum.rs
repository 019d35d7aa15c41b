//! Ciphertext integrity checksums.
//!
//! Computed over ciphertext (post-encryption) so corrupted-at-rest data can
//! be flagged without any key. Complements — never replaces — the cipher's
//! own authentication tag, which only a key holder can check.

use sha2::{Digest, Sha256};

/// Hex SHA-256 digest of the given ciphertext bytes.
pub fn checksum(ciphertext: &[u8]) -> String {
    hex_encode(Sha256::digest(ciphertext))
}

/// Check ciphertext bytes against a previously recorded checksum.
pub fn verify(ciphertext: &[u8], digest: &str) -> bool {
    checksum(ciphertext) == digest
}

fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    bytes
        .as_ref()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
