//! Gzip compression for note payloads.
//!
//! Applied strictly before encryption on the write path and strictly after
//! decryption on the read path — compressing ciphertext gains nothing, and
//! encrypt-then-compress would leak plaintext structure.

use crate::error::{CryptoError, CryptoResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Compress a byte payload (gzip, default level).
pub fn compress(data: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| CryptoError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CryptoError::Compression(e.to_string()))
}

/// Decompress a gzip stream.
///
/// A malformed stream fails with [`CryptoError::CorruptStream`] — a distinct
/// kind from authentication failure so the two read aborts stay diagnosable.
pub fn decompress(data: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CryptoError::CorruptStream(e.to_string()))?;
    Ok(out)
}
