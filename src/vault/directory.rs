//! Account directory: usernames and their salted master-password hashes.
//!
//! The directory file is shared by every `AccountDirectory` opened on it,
//! in this process or another.  Each registration re-reads the file under
//! a process-wide lock before checking the name, then writes it back
//! (encrypted, atomically).  Lookups re-read it too, so accounts created
//! elsewhere are visible.  The raw master password never leaves the
//! hashing call.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::crypto::kdf::{self, Argon2Params};
use crate::crypto::keys::EncryptionKey;
use crate::errors::{Result, SafePassError};

use super::format::{self, base64_decode, base64_encode};

/// Longest accepted username.
const MAX_USERNAME_LEN: usize = 64;

/// Argon2 parameters stored with each account so the exact same hash
/// settings are used when the owner logs in again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArgon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl From<Argon2Params> for StoredArgon2Params {
    fn from(p: Argon2Params) -> Self {
        Self {
            memory_kib: p.memory_kib,
            iterations: p.iterations,
            parallelism: p.parallelism,
        }
    }
}

impl From<StoredArgon2Params> for Argon2Params {
    fn from(p: StoredArgon2Params) -> Self {
        Self {
            memory_kib: p.memory_kib,
            iterations: p.iterations,
            parallelism: p.parallelism,
        }
    }
}

/// Persisted form of an account.
#[derive(Clone, Serialize, Deserialize)]
struct AccountRecord {
    username: String,

    /// Random id fixed at registration; keys the credential file.
    id: String,

    /// Argon2id output (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    password_hash: Vec<u8>,

    /// Per-account random salt (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    salt: Vec<u8>,

    argon2_params: StoredArgon2Params,

    created_at: DateTime<Utc>,
}

impl AccountRecord {
    fn account(&self) -> Account {
        Account {
            username: self.username.clone(),
            id: self.id.clone(),
            created_at: self.created_at,
        }
    }
}

/// Plaintext layout of the directory snapshot file.
#[derive(Default, Serialize, Deserialize)]
struct DirectorySnapshot {
    accounts: Vec<AccountRecord>,
}

/// A registered account as seen by callers (no hash material).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    /// 128-bit random id, hex encoded.  Unique per registration even when
    /// a username is reused.
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// A fresh identity for `username` with a new random id.
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            id: format!("{:032x}", rand::rng().random::<u128>()),
            created_at: Utc::now(),
        }
    }
}

/// Username -> salted hash map, persisted as an encrypted snapshot.
pub struct AccountDirectory {
    path: PathBuf,
    key: Arc<EncryptionKey>,
    hash_params: Argon2Params,
    file_lock: Arc<Mutex<()>>,
    accounts: RwLock<BTreeMap<String, AccountRecord>>,
}

impl AccountDirectory {
    /// Load the directory from `path` (empty if the file does not exist).
    ///
    /// `hash_params` are used for new registrations only; existing
    /// accounts keep the parameters they were created with.
    pub fn open(path: &Path, key: Arc<EncryptionKey>, hash_params: Argon2Params) -> Result<Self> {
        hash_params.validate()?;

        let accounts = load_accounts(path, &key)?;
        debug!(path = %path.display(), accounts = accounts.len(), "loaded account directory");

        Ok(Self {
            path: path.to_path_buf(),
            key,
            hash_params,
            file_lock: file_lock(path)?,
            accounts: RwLock::new(accounts),
        })
    }

    /// Register a new account and persist the directory.
    ///
    /// Fails with `UsernameTaken` if the name, compared without regard to
    /// ASCII case, is already registered.  Names that differ only in case
    /// would share a credential file on case-insensitive filesystems.  If
    /// the directory cannot be written the account is not kept.
    pub fn register(&self, username: &str, master_password: &str) -> Result<Account> {
        validate_username(username)?;
        if master_password.is_empty() {
            return Err(SafePassError::InvalidInput(
                "master password cannot be empty".into(),
            ));
        }

        // Cheap early exit before paying for Argon2.
        if let Some(taken) = self.taken_name(username)? {
            return Err(SafePassError::UsernameTaken(taken));
        }

        let salt = kdf::generate_salt();
        let hash = kdf::hash_password(master_password.as_bytes(), &salt, &self.hash_params)?;

        let account = Account::new(username);
        let record = AccountRecord {
            username: account.username.clone(),
            id: account.id.clone(),
            password_hash: hash.to_vec(),
            salt: salt.to_vec(),
            argon2_params: self.hash_params.into(),
            created_at: account.created_at,
        };

        let _file = self.lock_file()?;
        let mut accounts = self.write()?;
        // Pick up registrations made since the check above, here or by
        // another directory on the same file.
        *accounts = load_accounts(&self.path, &self.key)?;
        if let Some(taken) = find_taken(&accounts, username) {
            return Err(SafePassError::UsernameTaken(taken));
        }
        accounts.insert(username.to_string(), record);

        if let Err(e) = self.persist(&accounts) {
            accounts.remove(username);
            warn!(username, "registration rolled back: {e}");
            return Err(e);
        }

        info!(username, "registered account");
        Ok(account)
    }

    /// Delete the account registered as `account`, if it is still there.
    ///
    /// Used to undo a registration whose session could not be started.
    /// An account with the same name but a different id is left alone.
    pub(crate) fn unregister(&self, account: &Account) -> Result<bool> {
        let _file = self.lock_file()?;
        let mut accounts = self.write()?;
        *accounts = load_accounts(&self.path, &self.key)?;

        let Some(record) = accounts.get(&account.username) else {
            return Ok(false);
        };
        if record.id != account.id {
            return Ok(false);
        }
        let removed = accounts.remove(&account.username);

        if let Err(e) = self.persist(&accounts) {
            if let Some(record) = removed {
                accounts.insert(account.username.clone(), record);
            }
            return Err(e);
        }

        info!(username = %account.username, "registration undone");
        Ok(true)
    }

    /// Check `master_password` for `username`.
    pub fn authenticate(&self, username: &str, master_password: &str) -> Result<Account> {
        self.refresh()?;
        let record = self
            .read()?
            .get(username)
            .cloned()
            .ok_or_else(|| SafePassError::UnknownUser(username.to_string()))?;

        let params: Argon2Params = record.argon2_params.into();
        if !kdf::verify_password(
            master_password.as_bytes(),
            &record.salt,
            &record.password_hash,
            &params,
        )? {
            warn!(username, "authentication failed");
            return Err(SafePassError::InvalidCredentials);
        }

        debug!(username, "authenticated");
        Ok(record.account())
    }

    /// The registered name `username` collides with, ignoring ASCII case.
    pub(crate) fn taken_name(&self, username: &str) -> Result<Option<String>> {
        self.refresh()?;
        Ok(find_taken(&*self.read()?, username))
    }

    /// Returns `true` if `username` is registered.
    pub fn contains(&self, username: &str) -> Result<bool> {
        self.refresh()?;
        Ok(self.read()?.contains_key(username))
    }

    /// All registered usernames, sorted.
    pub fn usernames(&self) -> Result<Vec<String>> {
        self.refresh()?;
        Ok(self.read()?.keys().cloned().collect())
    }

    /// Number of registered accounts.
    pub fn len(&self) -> Result<usize> {
        self.refresh()?;
        Ok(self.read()?.len())
    }

    /// Returns `true` if no account is registered.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Path of the directory file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory map with what is on disk.
    fn refresh(&self) -> Result<()> {
        let fresh = load_accounts(&self.path, &self.key)?;
        *self.write()? = fresh;
        Ok(())
    }

    fn lock_file(&self) -> Result<MutexGuard<'_, ()>> {
        self.file_lock
            .lock()
            .map_err(|_| SafePassError::StorageUnavailable("account directory lock poisoned".into()))
    }

    fn persist(&self, accounts: &BTreeMap<String, AccountRecord>) -> Result<()> {
        let snapshot = DirectorySnapshot {
            accounts: accounts.values().cloned().collect(),
        };
        let file_key = self.key.directory_key()?;
        format::write_snapshot(&self.path, file_key.as_ref(), &snapshot)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, AccountRecord>>> {
        self.accounts
            .read()
            .map_err(|_| SafePassError::StorageUnavailable("account directory lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, AccountRecord>>> {
        self.accounts
            .write()
            .map_err(|_| SafePassError::StorageUnavailable("account directory lock poisoned".into()))
    }
}

impl std::fmt::Debug for AccountDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountDirectory")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn load_accounts(path: &Path, key: &EncryptionKey) -> Result<BTreeMap<String, AccountRecord>> {
    let file_key = key.directory_key()?;
    let snapshot: DirectorySnapshot =
        format::read_snapshot(path, file_key.as_ref())?.unwrap_or_default();

    Ok(snapshot
        .accounts
        .into_iter()
        .map(|a| (a.username.clone(), a))
        .collect())
}

/// The registered name that `username` collides with, ignoring ASCII case.
fn find_taken(accounts: &BTreeMap<String, AccountRecord>, username: &str) -> Option<String> {
    accounts
        .keys()
        .find(|existing| existing.eq_ignore_ascii_case(username))
        .cloned()
}

/// The mutex guarding read-modify-write of the directory file at `path`.
///
/// Every `AccountDirectory` in the process opened on the same file gets
/// the same mutex.
fn file_lock(path: &Path) -> Result<Arc<Mutex<()>>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

    let mut locks = LOCKS
        .get_or_init(Default::default)
        .lock()
        .map_err(|_| SafePassError::StorageUnavailable("directory lock table poisoned".into()))?;
    Ok(Arc::clone(locks.entry(lock_key(path)).or_default()))
}

/// Canonical form of `path` for `file_lock`.  The file itself may not
/// exist yet, so only its parent is resolved.
fn lock_key(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (fs::canonicalize(parent), path.file_name()) {
        (Ok(parent), Some(name)) => parent.join(name),
        _ => path.to_path_buf(),
    }
}

/// Validate that a username is safe to use as a file name.
///
/// Allowed: ASCII letters, digits, underscores, hyphens, periods.
/// Must be non-empty, at most 64 characters, and not start with a period.
pub fn validate_username(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SafePassError::InvalidInput("username cannot be empty".into()));
    }
    if name.len() > MAX_USERNAME_LEN {
        return Err(SafePassError::InvalidInput(format!(
            "username cannot exceed {MAX_USERNAME_LEN} characters"
        )));
    }
    if name.starts_with('.') {
        return Err(SafePassError::InvalidInput(format!(
            "username '{name}' cannot start with a period"
        )));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(SafePassError::InvalidInput(format!(
            "username '{name}' contains invalid characters: only ASCII letters, digits, underscores, hyphens, and periods are allowed"
        )));
    }
    Ok(())
}
