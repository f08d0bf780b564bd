//! `VaultService`: the single entry point the CLI (or any other shell)
//! talks to.
//!
//! The service is a two-state machine: anonymous, or authenticated as
//! exactly one account.  Credential operations require the authenticated
//! state and every mutating call is persisted before it returns.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::crypto::keystore::KeyStore;
use crate::errors::{Result, SafePassError};

use super::directory::{validate_username, Account, AccountDirectory};
use super::entry::EntryMetadata;
use super::store::CredentialStore;

/// The authenticated state: who is logged in and their decrypted-on-demand
/// credential store.
struct Session {
    account: Account,
    store: CredentialStore,
    path: PathBuf,
}

/// Orchestrates key storage, the account directory and the active
/// account's credential store.
pub struct VaultService {
    settings: Settings,
    keys: KeyStore,
    directory: AccountDirectory,
    session: RwLock<Option<Session>>,
}

impl VaultService {
    /// Open the vault described by `settings`.
    ///
    /// Creates the data directory and encryption key on first run, then
    /// loads the account directory.  The service starts anonymous.
    pub fn open(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let keys = KeyStore::new(settings.key_path());
        let key = keys.load_or_create()?;
        let directory =
            AccountDirectory::open(&settings.directory_path(), key, settings.argon2_params())?;

        info!(data_dir = %settings.data_dir.display(), "vault opened");

        Ok(Self {
            settings,
            keys,
            directory,
            session: RwLock::new(None),
        })
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Create a new account and log into it.
    ///
    /// A name whose credential file is already on disk is `UsernameTaken`
    /// even if the directory does not list it: the file belongs to an
    /// earlier account and the new one could never open it.  If the
    /// session cannot be started the registration is undone, so a failed
    /// `register` never leaves an account behind.
    pub fn register(&self, username: &str, master_password: &str) -> Result<Account> {
        validate_username(username)?;
        if let Some(taken) = self.directory.taken_name(username)? {
            return Err(SafePassError::UsernameTaken(taken));
        }
        let path = self.settings.credentials_path(username);
        if path.exists() {
            warn!(username, path = %path.display(), "unclaimed credential file blocks registration");
            return Err(SafePassError::UsernameTaken(username.to_string()));
        }

        let account = self.directory.register(username, master_password)?;
        match self.start_session(account.clone()) {
            Ok(account) => Ok(account),
            Err(e) => {
                warn!(username, "session start failed, undoing registration: {e}");
                if let Err(undo) = self.directory.unregister(&account) {
                    warn!(username, "could not undo registration: {undo}");
                }
                Err(e)
            }
        }
    }

    /// Authenticate and load the account's credential store.
    ///
    /// Any previous session is replaced.
    pub fn login(&self, username: &str, master_password: &str) -> Result<Account> {
        let account = self.directory.authenticate(username, master_password)?;
        self.start_session(account)
    }

    /// Drop the active session and its credential store.
    pub fn logout(&self) {
        let mut session = match self.session.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(ended) = session.take() {
            debug!(username = %ended.account.username, "logged out");
        }
    }

    /// Username of the logged-in account, if any.
    pub fn current_user(&self) -> Option<String> {
        self.session
            .read()
            .ok()?
            .as_ref()
            .map(|s| s.account.username.clone())
    }

    /// Returns `true` while an account is logged in.
    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    fn start_session(&self, account: Account) -> Result<Account> {
        let key = self.keys.load_or_create()?;
        let path = self.settings.credentials_path(&account.username);
        let store = CredentialStore::load(&path, &account, key)?;

        info!(username = %account.username, entries = store.len(), "session started");

        *self.write_session()? = Some(Session {
            account: account.clone(),
            store,
            path,
        });
        Ok(account)
    }

    // ------------------------------------------------------------------
    // Credential operations
    // ------------------------------------------------------------------

    /// Add or overwrite the password for `site`, then persist.
    pub fn add(&self, site: &str, password: &str, category: Option<&str>) -> Result<()> {
        self.mutate(|store| {
            store.add(site, password, category)?;
            Ok(((), true))
        })
    }

    /// Decrypt the password for `site`; `None` if the site is unknown.
    pub fn retrieve(&self, site: &str) -> Result<Option<String>> {
        self.with_store(|store| store.retrieve(site))
    }

    /// Remove `site`, persisting only if something was removed.
    pub fn remove(&self, site: &str) -> Result<bool> {
        self.mutate(|store| {
            let removed = store.remove(site);
            Ok((removed, removed))
        })
    }

    /// Set the category of an existing site, then persist.
    pub fn categorize(&self, site: &str, category: &str) -> Result<bool> {
        self.mutate(|store| {
            let found = store.categorize(site, category)?;
            Ok((found, found))
        })
    }

    /// Whether `site` has a stored password.
    pub fn contains(&self, site: &str) -> Result<bool> {
        self.with_store(|store| Ok(store.contains(site)))
    }

    /// Sites tagged with `category`, sorted.
    pub fn list_by_category(&self, category: &str) -> Result<Vec<String>> {
        self.with_store(|store| Ok(store.list_by_category(category)))
    }

    /// Every stored site, sorted.
    pub fn list_sites(&self) -> Result<Vec<String>> {
        self.with_store(|store| Ok(store.list_sites()))
    }

    /// Metadata for every entry, sorted by site.
    pub fn list_entries(&self) -> Result<Vec<EntryMetadata>> {
        self.with_store(|store| Ok(store.list()))
    }

    /// Decrypt every stored password.  For export only.
    pub fn export_all(&self) -> Result<BTreeMap<String, String>> {
        self.with_store(CredentialStore::list_all_decrypted)
    }

    /// Add every `site -> password` pair and persist once.
    ///
    /// All-or-nothing: if any pair is rejected or the write fails, the
    /// store is left unchanged.
    pub fn import<'a, I>(&self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.mutate(|store| {
            let mut count = 0;
            for (site, password) in entries {
                store.add(site, password, None)?;
                count += 1;
            }
            Ok((count, count > 0))
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The settings this service was opened with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The process-wide account directory.
    pub fn directory(&self) -> &AccountDirectory {
        &self.directory
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Run a read-only operation against the active store.
    fn with_store<T>(&self, op: impl FnOnce(&CredentialStore) -> Result<T>) -> Result<T> {
        let guard = self.read_session()?;
        let session = guard.as_ref().ok_or(SafePassError::NotAuthenticated)?;
        op(&session.store)
    }

    /// Run a mutating operation under the write lock.
    ///
    /// The operation works on a copy; when it reports a change the copy
    /// is persisted and only then becomes the live store.  A failed
    /// operation or write leaves memory and disk as they were.
    fn mutate<T>(&self, op: impl FnOnce(&mut CredentialStore) -> Result<(T, bool)>) -> Result<T> {
        let mut guard = self.write_session()?;
        let session = guard.as_mut().ok_or(SafePassError::NotAuthenticated)?;

        let mut draft = session.store.clone();
        let (value, changed) = op(&mut draft)?;
        if changed {
            draft.save(&session.path)?;
            session.store = draft;
        }
        Ok(value)
    }

    fn read_session(&self) -> Result<RwLockReadGuard<'_, Option<Session>>> {
        self.session
            .read()
            .map_err(|_| SafePassError::StorageUnavailable("session lock poisoned".into()))
    }

    fn write_session(&self) -> Result<RwLockWriteGuard<'_, Option<Session>>> {
        self.session
            .write()
            .map_err(|_| SafePassError::StorageUnavailable("session lock poisoned".into()))
    }
}

impl std::fmt::Debug for VaultService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultService")
            .field("data_dir", &self.settings.data_dir)
            .field("user", &self.current_user())
            .finish()
    }
}
