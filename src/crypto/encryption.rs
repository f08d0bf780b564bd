//! AES-256-GCM authenticated encryption.
//!
//! Each call to `encrypt` generates a fresh random 12-byte nonce and
//! prepends it to the ciphertext.  `decrypt` splits the nonce back out
//! before decrypting.
//!
//! Layout of the returned byte buffer:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]
//!
//! The `_with_aad` variants also authenticate bytes that are stored in
//! the clear next to the ciphertext (the snapshot header).

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{Result, SafePassError};

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
const TAG_LEN: usize = 16;

/// Encrypt `plaintext` with a 32-byte `key`.
///
/// Returns the nonce prepended to the ciphertext (nonce || ciphertext).
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    encrypt_with_aad(key, plaintext, &[])
}

/// Decrypt data that was produced by `encrypt`.
///
/// Any failure (short input, wrong key, flipped bit) is reported as
/// `DecryptionFailed`; no partial plaintext is ever returned.
pub fn decrypt(key: &[u8], ciphertext_with_nonce: &[u8]) -> Result<Vec<u8>> {
    decrypt_with_aad(key, ciphertext_with_nonce, &[])
}

/// Like `encrypt`, additionally binding `aad` into the auth tag.
pub fn encrypt_with_aad(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| SafePassError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| SafePassError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Like `decrypt`; fails unless `aad` matches what was encrypted.
pub fn decrypt_with_aad(key: &[u8], ciphertext_with_nonce: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if ciphertext_with_nonce.len() < NONCE_LEN + TAG_LEN {
        return Err(SafePassError::DecryptionFailed);
    }

    let (nonce_bytes, ciphertext) = ciphertext_with_nonce.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| SafePassError::DecryptionFailed)?;

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| SafePassError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ciphertext_carries_nonce_and_tag() {
        let key = [7u8; 32];
        let ct = encrypt(&key, b"hunter2").unwrap();
        assert_eq!(ct.len(), NONCE_LEN + b"hunter2".len() + TAG_LEN);
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let key = [9u8; 32];
        let ct = encrypt(&key, b"").unwrap();
        assert_eq!(decrypt(&key, &ct).unwrap(), b"");
    }

    #[test]
    fn bad_key_length_is_an_encryption_error() {
        let result = encrypt(&[0u8; 5], b"data");
        assert!(matches!(result, Err(SafePassError::EncryptionFailed(_))));
    }

    #[test]
    fn nonce_only_input_is_rejected() {
        let key = [1u8; 32];
        let result = decrypt(&key, &[0u8; NONCE_LEN]);
        assert!(matches!(result, Err(SafePassError::DecryptionFailed)));
    }

    #[test]
    fn aad_must_match() {
        let key = [3u8; 32];
        let ct = encrypt_with_aad(&key, b"payload", b"SPVT\x01").unwrap();

        assert_eq!(decrypt_with_aad(&key, &ct, b"SPVT\x01").unwrap(), b"payload");
        assert!(matches!(
            decrypt_with_aad(&key, &ct, b"SPVT\x02"),
            Err(SafePassError::DecryptionFailed)
        ));
        assert!(matches!(decrypt(&key, &ct), Err(SafePassError::DecryptionFailed)));
    }
}
