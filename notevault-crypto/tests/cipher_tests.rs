use notevault_crypto::{
    checksum, compress, decompress, decrypt, encrypt, generate_random_key, verify, CryptoError,
    NONCE_SIZE, TAG_SIZE,
};

#[test]
fn encrypt_decrypt_roundtrip() {
    let key = generate_random_key();
    let plaintext = b"hello world";

    let enc = encrypt(&key, plaintext).unwrap();
    let recovered = decrypt(&key, &enc).unwrap();

    assert_eq!(recovered, plaintext);
}

#[test]
fn ciphertext_carries_tag() {
    let key = generate_random_key();
    let plaintext = b"payload";

    let enc = encrypt(&key, plaintext).unwrap();
    assert_eq!(enc.ciphertext.len(), plaintext.len() + TAG_SIZE);
    assert_eq!(enc.nonce.len(), NONCE_SIZE);
}

#[test]
fn empty_payload_roundtrips() {
    let key = generate_random_key();
    let enc = encrypt(&key, b"").unwrap();
    assert_eq!(decrypt(&key, &enc).unwrap(), b"");
}

#[test]
fn each_encrypt_uses_fresh_nonce() {
    let key = generate_random_key();
    let enc1 = encrypt(&key, b"same payload").unwrap();
    let enc2 = encrypt(&key, b"same payload").unwrap();

    assert_ne!(enc1.nonce, enc2.nonce);
    assert_ne!(enc1.ciphertext, enc2.ciphertext);
}

#[test]
fn wrong_key_fails_closed() {
    let key = generate_random_key();
    let other = generate_random_key();

    let enc = encrypt(&key, b"secret note body").unwrap();
    assert!(matches!(
        decrypt(&other, &enc),
        Err(CryptoError::Decryption)
    ));
}

#[test]
fn tampered_ciphertext_fails() {
    let key = generate_random_key();
    let mut enc = encrypt(&key, b"secret note body").unwrap();
    enc.ciphertext[0] ^= 0x01;

    assert!(matches!(decrypt(&key, &enc), Err(CryptoError::Decryption)));
}

#[test]
fn tampered_tag_fails() {
    let key = generate_random_key();
    let mut enc = encrypt(&key, b"secret note body").unwrap();
    let last = enc.ciphertext.len() - 1; // tag is the ciphertext tail
    enc.ciphertext[last] ^= 0x01;

    assert!(matches!(decrypt(&key, &enc), Err(CryptoError::Decryption)));
}

#[test]
fn tampered_nonce_fails() {
    let key = generate_random_key();
    let mut enc = encrypt(&key, b"secret note body").unwrap();
    enc.nonce[0] ^= 0x01;

    assert!(matches!(decrypt(&key, &enc), Err(CryptoError::Decryption)));
}

#[test]
fn every_single_bit_flip_is_detected() {
    let key = generate_random_key();
    let enc = encrypt(&key, b"ab").unwrap();

    for byte_idx in 0..enc.ciphertext.len() {
        for bit in 0..8 {
            let mut tampered = enc.clone();
            tampered.ciphertext[byte_idx] ^= 1 << bit;
            assert!(
                decrypt(&key, &tampered).is_err(),
                "flip at byte {byte_idx} bit {bit} went undetected"
            );
        }
    }
}

#[test]
fn decryption_error_reveals_nothing() {
    let key = generate_random_key();
    let mut enc = encrypt(&key, b"secret").unwrap();
    enc.ciphertext[0] ^= 0xFF;

    let tampered_msg = decrypt(&key, &enc).unwrap_err().to_string();
    let wrong_key_msg = decrypt(&generate_random_key(), &encrypt(&key, b"x").unwrap())
        .unwrap_err()
        .to_string();

    // Same message either way — no oracle about ciphertext vs. key fault
    assert_eq!(tampered_msg, wrong_key_msg);
}

#[test]
fn encrypted_data_serialization_roundtrip() {
    let key = generate_random_key();
    let enc = encrypt(&key, b"serialize me").unwrap();

    let json = serde_json::to_string(&enc).unwrap();
    let deserialized: notevault_crypto::EncryptedData = serde_json::from_str(&json).unwrap();

    assert_eq!(deserialized, enc);
    assert_eq!(decrypt(&key, &deserialized).unwrap(), b"serialize me");
}

// ── Compression ──────────────────────────────────────────────────

#[test]
fn compress_decompress_roundtrip() {
    let payload = b"hello world hello world hello world".repeat(10);
    let compressed = compress(&payload).unwrap();
    assert!(compressed.len() < payload.len());
    assert_eq!(decompress(&compressed).unwrap(), payload);
}

#[test]
fn garbage_stream_is_corrupt_not_auth_failure() {
    let result = decompress(b"\x00\x01\x02 definitely not gzip");
    assert!(matches!(result, Err(CryptoError::CorruptStream(_))));
}

#[test]
fn truncated_stream_is_corrupt() {
    let compressed = compress(b"some payload that will be truncated").unwrap();
    let truncated = &compressed[..compressed.len() / 2];
    assert!(matches!(
        decompress(truncated),
        Err(CryptoError::CorruptStream(_))
    ));
}

#[test]
fn compress_then_encrypt_roundtrip() {
    let key = generate_random_key();
    let plaintext = b"the full write pipeline".repeat(20);

    let compressed = compress(&plaintext).unwrap();
    let enc = encrypt(&key, &compressed).unwrap();

    let decrypted = decrypt(&key, &enc).unwrap();
    assert_eq!(decrypted, compressed);
    assert_eq!(decompress(&decrypted).unwrap(), plaintext);
}

// ── Checksums ────────────────────────────────────────────────────

#[test]
fn checksum_is_stable() {
    let data = b"ciphertext bytes";
    let digest = checksum(data);
    assert_eq!(digest, checksum(data));
    assert!(verify(data, &digest));
}

#[test]
fn checksum_fails_on_any_mutation() {
    let data = b"ciphertext bytes".to_vec();
    let digest = checksum(&data);

    for i in 0..data.len() {
        let mut copy = data.clone();
        copy[i] ^= 0x01;
        assert!(!verify(&copy, &digest), "mutation at byte {i} not caught");
    }
}

#[test]
fn checksum_is_hex_sha256() {
    let digest = checksum(b"");
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
}

// Property-based tests
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn encrypt_decrypt_always_roundtrips(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
            let key = generate_random_key();
            let enc = encrypt(&key, &payload).unwrap();
            prop_assert_eq!(decrypt(&key, &enc).unwrap(), payload);
        }

        #[test]
        fn compress_decompress_always_roundtrips(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
            let compressed = compress(&payload).unwrap();
            prop_assert_eq!(decompress(&compressed).unwrap(), payload);
        }

        #[test]
        fn verify_accepts_exact_bytes_only(payload in proptest::collection::vec(any::<u8>(), 1..256), flip in 0usize..256) {
            let digest = checksum(&payload);
            prop_assert!(verify(&payload, &digest));

            let mut mutated = payload.clone();
            let idx = flip % mutated.len();
            mutated[idx] ^= 0x01;
            prop_assert!(!verify(&mutated, &digest));
        }
    }
}
