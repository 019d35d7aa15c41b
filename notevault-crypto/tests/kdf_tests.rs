use notevault_crypto::{
    derive_key, hash_unlock_secret, verify_unlock_secret, KdfParams, Salt, KEY_SIZE, MASTER_SALT,
    UNLOCK_SALT,
};

fn params() -> KdfParams {
    KdfParams::fast_insecure()
}

#[test]
fn derivation_is_deterministic() {
    let salt = Salt::random();
    let k1 = derive_key("123456", &salt, &params()).unwrap();
    let k2 = derive_key("123456", &salt, &params()).unwrap();
    assert_eq!(k1.as_bytes(), k2.as_bytes());
    assert_eq!(k1.as_bytes().len(), KEY_SIZE);
}

#[test]
fn different_secrets_produce_different_keys() {
    let salt = Salt::random();
    let k1 = derive_key("123456", &salt, &params()).unwrap();
    let k2 = derive_key("123457", &salt, &params()).unwrap();
    assert_ne!(k1.as_bytes(), k2.as_bytes());
}

#[test]
fn different_salts_produce_different_keys() {
    let k1 = derive_key("123456", &Salt::random(), &params()).unwrap();
    let k2 = derive_key("123456", &Salt::random(), &params()).unwrap();
    assert_ne!(k1.as_bytes(), k2.as_bytes());
}

#[test]
fn domain_salts_are_separated() {
    // Same secret under the two fixed domain salts must not collide
    let unlock = derive_key("shared-secret", &UNLOCK_SALT, &params()).unwrap();
    let master = derive_key("shared-secret", &MASTER_SALT, &params()).unwrap();
    assert_ne!(unlock.as_bytes(), master.as_bytes());
}

#[test]
fn short_numeric_pin_is_valid_input() {
    let key = derive_key("0000", &UNLOCK_SALT, &params()).unwrap();
    assert_eq!(key.as_bytes().len(), KEY_SIZE);
}

#[test]
fn debug_output_redacts_key_material() {
    let key = derive_key("123456", &Salt::random(), &params()).unwrap();
    let debug = format!("{key:?}");
    assert!(debug.contains("REDACTED"));
}

// ── Unlock-secret hashing ────────────────────────────────────────

#[test]
fn hash_verifies_correct_secret() {
    let phc = hash_unlock_secret("123456").unwrap();
    assert!(verify_unlock_secret("123456", &phc).unwrap());
}

#[test]
fn hash_rejects_wrong_secret() {
    let phc = hash_unlock_secret("123456").unwrap();
    assert!(!verify_unlock_secret("654321", &phc).unwrap());
}

#[test]
fn hash_never_contains_raw_secret() {
    let secret = "my-unlock-secret-value";
    let phc = hash_unlock_secret(secret).unwrap();
    assert!(!phc.contains(secret));
    assert!(phc.starts_with("$argon2id$"));
}

#[test]
fn hashes_are_salted_per_call() {
    let h1 = hash_unlock_secret("123456").unwrap();
    let h2 = hash_unlock_secret("123456").unwrap();
    assert_ne!(h1, h2);
    assert!(verify_unlock_secret("123456", &h1).unwrap());
    assert!(verify_unlock_secret("123456", &h2).unwrap());
}

#[test]
fn malformed_phc_string_errors() {
    assert!(verify_unlock_secret("123456", "not-a-phc-string").is_err());
}
