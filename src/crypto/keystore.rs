//! Persisted installation key.
//!
//! The key file holds exactly 32 random bytes and is readable by the
//! owner only.  It is created the first time it is needed and never
//! rewritten afterwards; losing it makes every stored password
//! unrecoverable.
//!
//! Creation is race-free: the key is written to a private temp file
//! and published with a hard link, which fails if another writer got
//! there first.  The loser discards its key and reads the winner's.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rand::RngCore;
use tracing::{debug, info};
use zeroize::Zeroize;

use super::keys::EncryptionKey;
use crate::errors::{Result, SafePassError};

/// Owns the installation key file and the key loaded from it.
#[derive(Debug)]
pub struct KeyStore {
    path: PathBuf,
    cached: Mutex<Option<Arc<EncryptionKey>>>,
}

impl KeyStore {
    /// Create a key store backed by the file at `path`.
    ///
    /// Nothing is read or written until `load_or_create` is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    /// Path of the key file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the installation key, generating and persisting it if the
    /// key file does not exist yet.
    pub fn load_or_create(&self) -> Result<Arc<EncryptionKey>> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| SafePassError::StorageUnavailable("key store lock poisoned".into()))?;

        if let Some(key) = cached.as_ref() {
            return Ok(Arc::clone(key));
        }

        let key = match read_key_file(&self.path)? {
            Some(key) => {
                debug!(path = %self.path.display(), "loaded encryption key");
                key
            }
            None => create_key_file(&self.path)?,
        };

        let key = Arc::new(key);
        *cached = Some(Arc::clone(&key));
        Ok(key)
    }
}

/// Read the key file, returning `None` if it does not exist.
fn read_key_file(path: &Path) -> Result<Option<EncryptionKey>> {
    match fs::read(path) {
        Ok(mut bytes) => {
            let key = EncryptionKey::from_slice(&bytes);
            bytes.zeroize();
            key.map(Some)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SafePassError::StorageUnavailable(format!(
            "failed to read key file {}: {e}",
            path.display()
        ))),
    }
}

/// Generate a key and publish it at `path` unless another writer beats us.
fn create_key_file(path: &Path) -> Result<EncryptionKey> {
    let parent = path.parent().unwrap_or(Path::new("."));
    if !parent.as_os_str().is_empty() && !parent.exists() {
        fs::create_dir_all(parent).map_err(|e| {
            SafePassError::StorageUnavailable(format!(
                "cannot create data directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    let key = EncryptionKey::generate();
    let tmp_path = parent.join(format!(
        ".{}.{:016x}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        rand::rng().next_u64()
    ));

    if let Err(e) = write_private(&tmp_path, key.as_bytes()) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    let linked = fs::hard_link(&tmp_path, path);
    let _ = fs::remove_file(&tmp_path);

    match linked {
        Ok(()) => {
            info!(path = %path.display(), "generated new encryption key");
            Ok(key)
        }
        // Lost the race: the other writer's key is authoritative.
        Err(e) if e.kind() == ErrorKind::AlreadyExists => read_key_file(path)?.ok_or_else(|| {
            SafePassError::StorageUnavailable(format!(
                "key file {} vanished while loading",
                path.display()
            ))
        }),
        Err(e) => Err(SafePassError::StorageUnavailable(format!(
            "failed to write key file {}: {e}",
            path.display()
        ))),
    }
}

/// Create `path` exclusively with owner-only permissions and write `data`.
fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| {
        SafePassError::StorageUnavailable(format!("failed to create {}: {e}", path.display()))
    })?;
    file.write_all(data)?;
    file.sync_all()?;
    Ok(())
}
