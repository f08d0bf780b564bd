//! Per-account credential storage.
//!
//! `CredentialStore` maps sites to encrypted passwords and optional
//! categories.  It only ever holds ciphertext: plaintext exists on the
//! way into `add` and on the way out of `retrieve`/`list_all_decrypted`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroize;

use crate::crypto::encryption::{decrypt, encrypt};
use crate::crypto::keys::EncryptionKey;
use crate::errors::{Result, SafePassError};

use super::directory::Account;
use super::entry::{CredentialEntry, EntryMetadata};
use super::format;

/// Longest accepted site or category label.
const MAX_LABEL_LEN: usize = 256;

/// Plaintext layout of a credential snapshot file.
#[derive(Serialize, Deserialize)]
struct CredentialSnapshot {
    owner: String,
    entries: Vec<CredentialEntry>,
}

/// One account's credentials, keyed by site.
///
/// Entries are kept in a `BTreeMap`, so every listing comes back sorted
/// by site and is stable for a given state.
#[derive(Clone)]
pub struct CredentialStore {
    account: Account,
    entries: BTreeMap<String, CredentialEntry>,
    key: Arc<EncryptionKey>,
}

impl CredentialStore {
    // ------------------------------------------------------------------
    // Construction and persistence
    // ------------------------------------------------------------------

    /// Create an empty store for `account`.
    pub fn new(account: &Account, key: Arc<EncryptionKey>) -> Self {
        Self {
            account: account.clone(),
            entries: BTreeMap::new(),
            key,
        }
    }

    /// Load `account`'s store from `path`, or start empty if the file does
    /// not exist yet.
    ///
    /// The file is keyed by the account id, so a file written for another
    /// account (even one with the same username) is `DecryptionFailed`.
    pub fn load(path: &Path, account: &Account, key: Arc<EncryptionKey>) -> Result<Self> {
        let owner = account.username.as_str();
        let file_key = key.credentials_key(&account.id)?;
        let snapshot: Option<CredentialSnapshot> = format::read_snapshot(path, file_key.as_ref())?;

        let mut store = Self::new(account, key);
        if let Some(snapshot) = snapshot {
            if snapshot.owner != owner {
                return Err(SafePassError::InvalidSnapshot(format!(
                    "credential file belongs to '{}', not '{owner}'",
                    snapshot.owner
                )));
            }
            store.entries = snapshot
                .entries
                .into_iter()
                .map(|e| (e.site.clone(), e))
                .collect();
        }

        debug!(owner, entries = store.entries.len(), "loaded credential store");
        Ok(store)
    }

    /// Encrypt the whole store and write it to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = CredentialSnapshot {
            owner: self.account.username.clone(),
            entries: self.entries.values().cloned().collect(),
        };
        let file_key = self.key.credentials_key(&self.account.id)?;
        format::write_snapshot(path, file_key.as_ref(), &snapshot)?;

        debug!(
            owner = %self.account.username,
            entries = self.entries.len(),
            "saved credential store"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Credential operations
    // ------------------------------------------------------------------

    /// Add or overwrite the password for `site`.
    ///
    /// Last write wins.  When `category` is `None` an existing entry keeps
    /// its category; `created_at` is always preserved on overwrite.
    pub fn add(&mut self, site: &str, password: &str, category: Option<&str>) -> Result<()> {
        validate_label("site", site)?;
        if let Some(category) = category {
            validate_label("category", category)?;
        }

        let entry_key = self.key.entry_key(site)?;
        let ciphertext = encrypt(entry_key.as_ref(), password.as_bytes())?;

        let now = Utc::now();
        let existing = self.entries.get(site);
        let created_at = existing.map_or(now, |e| e.created_at);
        let category = category
            .map(str::to_string)
            .or_else(|| existing.and_then(|e| e.category.clone()));

        self.entries.insert(
            site.to_string(),
            CredentialEntry {
                site: site.to_string(),
                ciphertext,
                category,
                created_at,
                updated_at: now,
            },
        );
        Ok(())
    }

    /// Remove `site`.  Returns `false` if there was nothing to remove.
    pub fn remove(&mut self, site: &str) -> bool {
        self.entries.remove(site).is_some()
    }

    /// Decrypt the password for `site`, or `None` if the site is unknown.
    pub fn retrieve(&self, site: &str) -> Result<Option<String>> {
        self.entries
            .get(site)
            .map(|entry| self.decrypt_entry(entry))
            .transpose()
    }

    /// Set the category of an existing entry.  Returns `false` if the site
    /// is unknown.
    pub fn categorize(&mut self, site: &str, category: &str) -> Result<bool> {
        validate_label("category", category)?;

        match self.entries.get_mut(site) {
            Some(entry) => {
                entry.category = Some(category.to_string());
                entry.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// All sites tagged with `category`, sorted by site.
    pub fn list_by_category(&self, category: &str) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| e.category.as_deref() == Some(category))
            .map(|e| e.site.clone())
            .collect()
    }

    /// All stored sites, sorted.
    pub fn list_sites(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Metadata for every entry, sorted by site.
    pub fn list(&self) -> Vec<EntryMetadata> {
        self.entries.values().map(EntryMetadata::from).collect()
    }

    /// Decrypt every entry into a site -> password map.
    ///
    /// Export/debug paths only; fails as a whole if any entry cannot be
    /// decrypted.
    pub fn list_all_decrypted(&self) -> Result<BTreeMap<String, String>> {
        self.entries
            .values()
            .map(|entry| Ok((entry.site.clone(), self.decrypt_entry(entry)?)))
            .collect()
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The account this store belongs to.
    pub fn owner(&self) -> &str {
        &self.account.username
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Metadata-only membership check; nothing is decrypted.
    pub fn contains(&self, site: &str) -> bool {
        self.entries.contains_key(site)
    }

    fn decrypt_entry(&self, entry: &CredentialEntry) -> Result<String> {
        let entry_key = self.key.entry_key(&entry.site)?;
        let plaintext = decrypt(entry_key.as_ref(), &entry.ciphertext)?;

        String::from_utf8(plaintext).map_err(|e| {
            let mut bad_bytes = e.into_bytes();
            bad_bytes.zeroize();
            SafePassError::SerializationError("stored password is not valid UTF-8".to_string())
        })
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("owner", &self.account.username)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Validate a site or category label.
///
/// Must be non-blank, at most 256 characters and free of control
/// characters.  The label is stored exactly as given.
pub(crate) fn validate_label(kind: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SafePassError::InvalidInput(format!("{kind} cannot be empty")));
    }
    if value.chars().count() > MAX_LABEL_LEN {
        return Err(SafePassError::InvalidInput(format!(
            "{kind} cannot exceed {MAX_LABEL_LEN} characters"
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(SafePassError::InvalidInput(format!(
            "{kind} cannot contain control characters"
        )));
    }
    Ok(())
}
