//! Integration tests for the SafePass crypto module.

use std::sync::Arc;
use std::thread;

use safepass::crypto::kdf::{HASH_LEN, SALT_LEN};
use safepass::crypto::{
    decrypt, encrypt, generate_salt, hash_password, verify_password, Argon2Params, EncryptionKey,
    KeyStore,
};
use safepass::errors::SafePassError;
use tempfile::TempDir;

fn fast_params() -> Argon2Params {
    Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

// ---------------------------------------------------------------------------
// Encryption round-trip
// ---------------------------------------------------------------------------

#[test]
fn encrypt_decrypt_roundtrip() {
    let key = [0xABu8; 32];
    let plaintext = b"correct horse battery staple";

    let ciphertext = encrypt(&key, plaintext).expect("encrypt should succeed");

    // 12-byte nonce + 16-byte tag on top of the plaintext.
    assert_eq!(ciphertext.len(), plaintext.len() + 28);

    let recovered = decrypt(&key, &ciphertext).expect("decrypt should succeed");
    assert_eq!(recovered, plaintext);
}

#[test]
fn encrypt_produces_different_ciphertext_each_time() {
    let key = [0xCDu8; 32];
    let ct1 = encrypt(&key, b"p4ss").expect("encrypt 1");
    let ct2 = encrypt(&key, b"p4ss").expect("encrypt 2");

    assert_ne!(ct1, ct2, "two encryptions of the same plaintext must differ");
}

#[test]
fn decrypt_with_wrong_key_fails() {
    let ciphertext = encrypt(&[0x11u8; 32], b"TOP_SECRET").expect("encrypt");
    let result = decrypt(&[0x22u8; 32], &ciphertext);

    assert!(matches!(result, Err(SafePassError::DecryptionFailed)));
}

#[test]
fn decrypt_with_truncated_data_fails() {
    let key = [0xAAu8; 32];
    assert!(matches!(
        decrypt(&key, &[0u8; 5]),
        Err(SafePassError::DecryptionFailed)
    ));
    assert!(matches!(
        decrypt(&key, &[0u8; 27]),
        Err(SafePassError::DecryptionFailed)
    ));
}

#[test]
fn empty_plaintext_roundtrips() {
    let key = [0x42u8; 32];
    let ciphertext = encrypt(&key, b"").expect("encrypt");
    assert!(decrypt(&key, &ciphertext).expect("decrypt").is_empty());
}

// ---------------------------------------------------------------------------
// Password hashing
// ---------------------------------------------------------------------------

#[test]
fn salts_are_random_and_sized() {
    let a = generate_salt();
    let b = generate_salt();
    assert_eq!(a.len(), SALT_LEN);
    assert_ne!(a, b);
}

#[test]
fn same_password_and_salt_hash_identically() {
    let salt = [7u8; SALT_LEN];
    let h1 = hash_password(b"Secret1!", &salt, &fast_params()).expect("hash 1");
    let h2 = hash_password(b"Secret1!", &salt, &fast_params()).expect("hash 2");
    assert_eq!(h1, h2);
    assert_eq!(h1.len(), HASH_LEN);
}

#[test]
fn different_salts_give_different_hashes() {
    let h1 = hash_password(b"Secret1!", &[1u8; SALT_LEN], &fast_params()).expect("hash 1");
    let h2 = hash_password(b"Secret1!", &[2u8; SALT_LEN], &fast_params()).expect("hash 2");
    assert_ne!(h1, h2);
}

#[test]
fn verify_accepts_right_and_rejects_wrong_password() {
    let salt = generate_salt();
    let hash = hash_password(b"Secret1!", &salt, &fast_params()).expect("hash");

    assert!(verify_password(b"Secret1!", &salt, &hash, &fast_params()).expect("verify"));
    assert!(!verify_password(b"secret1!", &salt, &hash, &fast_params()).expect("verify"));
}

#[test]
fn weak_params_are_rejected() {
    let weak = Argon2Params {
        memory_kib: 1_024,
        iterations: 1,
        parallelism: 1,
    };
    assert!(matches!(
        hash_password(b"pw", &[0u8; SALT_LEN], &weak),
        Err(SafePassError::KeyDerivationFailed(_))
    ));
}

// ---------------------------------------------------------------------------
// Sub-keys
// ---------------------------------------------------------------------------

#[test]
fn sub_keys_are_distinct_per_purpose() {
    let key = EncryptionKey::generate();

    let dir = key.directory_key().expect("directory key");
    let alice = key.credentials_key("alice").expect("alice key");
    let bob = key.credentials_key("bob").expect("bob key");
    let site = key.entry_key("example.com").expect("entry key");

    assert_ne!(*dir, *alice);
    assert_ne!(*alice, *bob);
    assert_ne!(*alice, *site);
    assert_ne!(&*dir, key.as_bytes());
}

#[test]
fn sub_keys_are_deterministic() {
    let key = EncryptionKey::new([9u8; 32]);
    assert_eq!(
        *key.entry_key("example.com").expect("first"),
        *key.entry_key("example.com").expect("second")
    );
}

#[test]
fn key_debug_output_is_redacted() {
    let key = EncryptionKey::new([0xEEu8; 32]);
    let debug = format!("{key:?}");
    assert!(debug.contains("REDACTED"));
    assert!(!debug.contains("238"));
}

// ---------------------------------------------------------------------------
// Key store
// ---------------------------------------------------------------------------

#[test]
fn key_file_is_created_once_and_reused() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data").join("encryption.key");

    let first = KeyStore::new(&path).load_or_create().expect("create");
    let written = std::fs::read(&path).expect("key file exists");
    assert_eq!(written.len(), 32);

    let second = KeyStore::new(&path).load_or_create().expect("load");
    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(std::fs::read(&path).unwrap(), written);
}

#[test]
fn concurrent_key_stores_agree_on_one_key() {
    let dir = TempDir::new().unwrap();
    let path = Arc::new(dir.path().join("encryption.key"));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let path = Arc::clone(&path);
            thread::spawn(move || {
                *KeyStore::new(path.as_path())
                    .load_or_create()
                    .expect("load_or_create")
                    .as_bytes()
            })
        })
        .collect();

    let keys: Vec<[u8; 32]> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(keys.windows(2).all(|w| w[0] == w[1]));
}

#[cfg(unix)]
#[test]
fn key_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("encryption.key");
    KeyStore::new(&path).load_or_create().expect("create");

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn truncated_key_file_is_storage_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("encryption.key");
    std::fs::write(&path, [1u8; 10]).unwrap();

    assert!(matches!(
        KeyStore::new(&path).load_or_create(),
        Err(SafePassError::StorageUnavailable(_))
    ));
}
