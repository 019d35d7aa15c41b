//! Authenticated encryption using ChaCha20-Poly1305.

use crate::error::{CryptoError, CryptoResult};
use crate::key::DerivedKey;
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    ChaCha20Poly1305, Key, Nonce,
};
use serde::{Deserialize, Serialize};

pub use notevault_types::NONCE_SIZE;

/// Poly1305 authentication tag length (bytes), appended to the ciphertext.
pub const TAG_SIZE: usize = 16;

/// Nonce + ciphertext pair produced by [`encrypt`].
///
/// The ciphertext carries the 16-byte Poly1305 tag at its tail; verification
/// happens inside [`decrypt`], never as a separate step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Encrypt a payload under the given key.
///
/// The 12-byte nonce comes fresh from the OS CSPRNG on every call — never a
/// counter, never derived, never reused for a given key.
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<EncryptedData> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(EncryptedData {
        nonce: nonce.into(),
        ciphertext,
    })
}

/// Decrypt and verify a payload.
///
/// Fails closed: any bit flip in ciphertext, tag, nonce, or a wrong key
/// yields [`CryptoError::Decryption`] and no partial plaintext. The error
/// carries no detail about which input was at fault.
pub fn decrypt(key: &DerivedKey, data: &EncryptedData) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    cipher
        .decrypt(Nonce::from_slice(&data.nonce), data.ciphertext.as_ref())
        .map_err(|_| CryptoError::Decryption)
}
