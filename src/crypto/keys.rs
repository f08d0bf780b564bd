//! The installation encryption key and its HKDF-SHA256 sub-keys.
//!
//! From the single persisted key we derive:
//! - A **directory** key for the account directory file.
//! - A **credentials** key per account (by account id) for that
//!   account's vault file.
//! - An **entry** key per site for each stored password.
//!
//! HKDF (RFC 5869) uses the installation key as input keying material
//! (IKM) and a context string (`info`) to produce independent sub-keys.

use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::errors::{Result, SafePassError};

/// Length of the encryption key and every derived sub-key (256 bits).
pub const KEY_LEN: usize = 32;

/// The installation-wide AES-256 key, zeroed when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_LEN],
}

impl EncryptionKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut bytes);
        let key = Self::new(bytes);
        bytes.zeroize();
        key
    }

    /// Build a key from a slice, rejecting anything that is not 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_LEN] = slice.try_into().map_err(|_| {
            SafePassError::StorageUnavailable(format!(
                "encryption key must be exactly {KEY_LEN} bytes, got {}",
                slice.len()
            ))
        })?;
        Ok(Self::new(bytes))
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Key for the account directory file.
    pub fn directory_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        hkdf_derive(&self.bytes, b"safepass-directory")
    }

    /// Key for one account's credential file.
    ///
    /// `account_id` is the random id assigned at registration, not the
    /// username, so an account re-created under the same name cannot open
    /// a file left behind by an earlier owner.
    pub fn credentials_key(&self, account_id: &str) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        let info = format!("safepass-credentials:{account_id}");
        hkdf_derive(&self.bytes, info.as_bytes())
    }

    /// Key for a single stored password.
    ///
    /// Binding the key to the site means a ciphertext copied onto a
    /// different site will not decrypt.
    pub fn entry_key(&self, site: &str) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        let info = format!("safepass-entry:{site}");
        hkdf_derive(&self.bytes, info.as_bytes())
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Run HKDF-SHA256 expand with the given `info`.
///
/// The extract step runs with an empty salt; the input is already a
/// uniformly random 256-bit key.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(info, okm.as_mut())
        .map_err(|e| SafePassError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}
