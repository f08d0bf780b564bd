//! Encrypted snapshot file format.
//!
//! Both the account directory and every per-account credential file use
//! the same envelope:
//!
//! ```text
//! [SPVT: 4 bytes][version: 1 byte][nonce + AES-256-GCM(JSON payload)]
//! ```
//!
//! - **Magic** (`SPVT`): identifies the file as a SafePass snapshot.
//! - **Version**: format version (currently `1`).
//! - **Body**: the serialized payload, encrypted and authenticated with a
//!   purpose-specific sub-key (see `crypto::keys`).  The 5-byte header is
//!   the AEAD associated data, so a changed byte anywhere in the file fails
//!   authentication.
//!
//! Writes are atomic (temp file + rename) so a crash mid-write leaves the
//! previous snapshot intact.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::encryption::{decrypt_with_aad, encrypt_with_aad};
use crate::errors::{Result, SafePassError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every snapshot file.
const MAGIC: &[u8; 4] = b"SPVT";

/// Current snapshot format version.
pub const CURRENT_VERSION: u8 = 1;

/// Fixed-size prefix: 4 (magic) + 1 (version).
const PREFIX_LEN: usize = 5;

/// The header every current snapshot starts with.
const HEADER: [u8; PREFIX_LEN] = [MAGIC[0], MAGIC[1], MAGIC[2], MAGIC[3], CURRENT_VERSION];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Serialize `payload`, encrypt it with `key` and write it to `path`
/// **atomically**.
///
/// 1. Serialize the payload to JSON.
/// 2. Encrypt the JSON (fresh nonce every time, header as AAD).
/// 3. Write the envelope to a uniquely named temp file in the same
///    directory (mode 0600).
/// 4. Rename the temp file over the target path.
pub fn write_snapshot<T: Serialize>(path: &Path, key: &[u8], payload: &T) -> Result<()> {
    let plaintext = Zeroizing::new(
        serde_json::to_vec(payload)
            .map_err(|e| SafePassError::SerializationError(format!("snapshot: {e}")))?,
    );
    let body = encrypt_with_aad(key, &plaintext, &HEADER)?;

    let mut buf = Vec::with_capacity(PREFIX_LEN + body.len());
    buf.extend_from_slice(&HEADER); // magic + version
    buf.extend_from_slice(&body);

    let parent = path.parent().unwrap_or(Path::new("."));
    if !parent.as_os_str().is_empty() && !parent.exists() {
        fs::create_dir_all(parent).map_err(|e| {
            SafePassError::StorageUnavailable(format!(
                "cannot create directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    // Same directory as the target so the rename is atomic.  The random
    // suffix keeps concurrent writers off each other's temp file.
    let tmp_path = parent.join(format!(
        ".{}.{:016x}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        rand::rng().next_u64()
    ));

    write_private(&tmp_path, &buf).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        e
    })?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        SafePassError::StorageUnavailable(format!("failed to replace {}: {e}", path.display()))
    })?;

    Ok(())
}

/// Read and decrypt a snapshot.
///
/// Returns `Ok(None)` if the file does not exist yet.  Anything that does
/// not authenticate is `DecryptionFailed`: a wrong key, a flipped bit in
/// the header or body, or a truncated file.  `InvalidSnapshot` is kept for
/// authenticated payloads that do not decode.
pub fn read_snapshot<T: DeserializeOwned>(path: &Path, key: &[u8]) -> Result<Option<T>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(SafePassError::StorageUnavailable(format!(
                "failed to read {}: {e}",
                path.display()
            )))
        }
    };

    if data.len() < PREFIX_LEN {
        debug!(path = %path.display(), "snapshot shorter than its header");
        return Err(SafePassError::DecryptionFailed);
    }

    let (header, body) = data.split_at(PREFIX_LEN);
    if header != HEADER {
        debug!(path = %path.display(), "snapshot header mismatch");
        return Err(SafePassError::DecryptionFailed);
    }

    let plaintext = Zeroizing::new(decrypt_with_aad(key, body, header)?);

    let payload = serde_json::from_slice(&plaintext)
        .map_err(|e| SafePassError::InvalidSnapshot(format!("payload JSON: {e}")))?;

    Ok(Some(payload))
}

/// Create (or truncate) `path` with owner-only permissions and write `data`.
fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| {
        SafePassError::StorageUnavailable(format!("failed to write {}: {e}", path.display()))
    })?;
    file.write_all(data)?;
    file.sync_all()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
