//! Integration tests for credential stores and the account directory.

use std::path::Path;
use std::sync::Arc;

use safepass::crypto::{Argon2Params, EncryptionKey};
use safepass::errors::SafePassError;
use safepass::vault::{Account, AccountDirectory, CredentialStore};
use tempfile::TempDir;

fn fast_params() -> Argon2Params {
    Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

fn test_key() -> Arc<EncryptionKey> {
    Arc::new(EncryptionKey::new([0x37u8; 32]))
}

/// A fixed identity so a store saved in one step loads in the next.
fn alice() -> Account {
    Account {
        username: "alice".into(),
        id: "00000000000000000000000000a11ce0".into(),
        created_at: chrono::Utc::now(),
    }
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

#[test]
fn store_roundtrips_many_passwords() {
    let mut store = CredentialStore::new(&alice(), test_key());
    let cases = [
        ("example.com", "p4ss"),
        ("bank.example", "with spaces and symbols !@#$%^&*()"),
        ("unicode.example", "pässwörd-🔑"),
        ("empty.example", ""),
        ("Example.com", "case is significant"),
    ];

    for (site, password) in cases {
        store.add(site, password, None).unwrap();
    }
    for (site, password) in cases {
        assert_eq!(store.retrieve(site).unwrap().as_deref(), Some(password));
    }
    assert_eq!(store.len(), cases.len());
}

#[test]
fn store_survives_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vaults").join("alice.vault");

    let mut store = CredentialStore::new(&alice(), test_key());
    store.add("a.example", "one", Some("Work")).unwrap();
    store.add("b.example", "two", None).unwrap();
    store.save(&path).unwrap();

    let loaded = CredentialStore::load(&path, &alice(), test_key()).unwrap();
    assert_eq!(loaded.retrieve("a.example").unwrap().as_deref(), Some("one"));
    assert_eq!(loaded.retrieve("b.example").unwrap().as_deref(), Some("two"));
    assert_eq!(loaded.list_by_category("Work"), vec!["a.example"]);
}

#[test]
fn saved_store_hides_passwords_and_sites() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("alice.vault");

    let mut store = CredentialStore::new(&alice(), test_key());
    store.add("example.com", "p4ssw0rd-plain", Some("Personal")).unwrap();
    store.save(&path).unwrap();

    let raw = std::fs::read(&path).unwrap();
    assert!(!contains_bytes(&raw, b"p4ssw0rd-plain"));
    assert!(!contains_bytes(&raw, b"example.com"));
    assert!(!contains_bytes(&raw, b"Personal"));
}

#[test]
fn another_account_cannot_read_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("alice.vault");

    let mut store = CredentialStore::new(&alice(), test_key());
    store.add("example.com", "p4ss", None).unwrap();
    store.save(&path).unwrap();

    // Another account id derives a different file key.
    assert!(matches!(
        CredentialStore::load(&path, &Account::new("bob"), test_key()),
        Err(SafePassError::DecryptionFailed)
    ));
}

#[test]
fn same_username_with_new_id_cannot_read_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("alice.vault");

    let mut store = CredentialStore::new(&alice(), test_key());
    store.add("bank.example", "alice-real-secret", None).unwrap();
    store.save(&path).unwrap();

    assert!(matches!(
        CredentialStore::load(&path, &Account::new("alice"), test_key()),
        Err(SafePassError::DecryptionFailed)
    ));
}

#[test]
fn tampered_store_file_fails_to_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("alice.vault");

    let mut store = CredentialStore::new(&alice(), test_key());
    store.add("example.com", "p4ss", None).unwrap();
    store.save(&path).unwrap();

    let mut raw = std::fs::read(&path).unwrap();
    let middle = raw.len() / 2;
    raw[middle] ^= 0x80;
    std::fs::write(&path, &raw).unwrap();

    assert!(matches!(
        CredentialStore::load(&path, &alice(), test_key()),
        Err(SafePassError::DecryptionFailed)
    ));
}

#[test]
fn removal_is_idempotent() {
    let mut store = CredentialStore::new(&alice(), test_key());
    assert!(!store.remove("never.example"));
    assert!(!store.remove("never.example"));
    assert!(store.is_empty());

    store.add("once.example", "pw", None).unwrap();
    assert!(store.remove("once.example"));
    assert!(!store.remove("once.example"));
    assert_eq!(store.retrieve("once.example").unwrap(), None);
}

#[test]
fn categories_partition_sites() {
    let mut store = CredentialStore::new(&alice(), test_key());
    store.add("a", "1", Some("Work")).unwrap();
    store.add("b", "2", Some("Personal")).unwrap();
    store.add("c", "3", None).unwrap();

    assert_eq!(store.list_by_category("Work"), vec!["a"]);
    assert_eq!(store.list_by_category("Personal"), vec!["b"]);
    assert!(store.list_by_category("Missing").is_empty());
    assert!(store.list_by_category("work").is_empty());
}

#[test]
fn overwrite_without_category_keeps_existing_one() {
    let mut store = CredentialStore::new(&alice(), test_key());
    store.add("a", "old", Some("Work")).unwrap();
    store.add("a", "new", None).unwrap();

    assert_eq!(store.retrieve("a").unwrap().as_deref(), Some("new"));
    assert_eq!(store.list_by_category("Work"), vec!["a"]);
    assert_eq!(store.len(), 1);
}

#[test]
fn categorize_unknown_site_reports_false() {
    let mut store = CredentialStore::new(&alice(), test_key());
    assert!(!store.categorize("ghost.example", "Work").unwrap());

    store.add("real.example", "pw", None).unwrap();
    assert!(store.categorize("real.example", "Work").unwrap());
    assert_eq!(store.list_by_category("Work"), vec!["real.example"]);
}

#[test]
fn invalid_labels_are_rejected() {
    let mut store = CredentialStore::new(&alice(), test_key());
    assert!(matches!(
        store.add("   ", "pw", None),
        Err(SafePassError::InvalidInput(_))
    ));
    assert!(matches!(
        store.add("tab\there", "pw", None),
        Err(SafePassError::InvalidInput(_))
    ));
    assert!(matches!(
        store.add("ok.example", "pw", Some("")),
        Err(SafePassError::InvalidInput(_))
    ));
    assert!(store.is_empty());
}

// ---------------------------------------------------------------------------
// AccountDirectory
// ---------------------------------------------------------------------------

fn open_directory(path: &Path) -> AccountDirectory {
    AccountDirectory::open(path, test_key(), fast_params()).unwrap()
}

#[test]
fn register_then_authenticate() {
    let dir = TempDir::new().unwrap();
    let directory = open_directory(&dir.path().join("users.vault"));

    let account = directory.register("u", "pw").unwrap();
    assert_eq!(account.username, "u");

    assert_eq!(directory.authenticate("u", "pw").unwrap().username, "u");
    assert!(matches!(
        directory.authenticate("u", "wrong"),
        Err(SafePassError::InvalidCredentials)
    ));
    assert!(matches!(
        directory.authenticate("nope", "x"),
        Err(SafePassError::UnknownUser(_))
    ));
}

#[test]
fn duplicate_username_is_rejected() {
    let dir = TempDir::new().unwrap();
    let directory = open_directory(&dir.path().join("users.vault"));

    directory.register("alice", "first-password").unwrap();
    assert!(matches!(
        directory.register("alice", "second-password"),
        Err(SafePassError::UsernameTaken(_))
    ));

    // The original password still works.
    directory.authenticate("alice", "first-password").unwrap();
    assert_eq!(directory.len().unwrap(), 1);
}

#[test]
fn registrations_persist_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.vault");

    {
        let directory = open_directory(&path);
        directory.register("alice", "Secret1!").unwrap();
        directory.register("bob", "hunter22").unwrap();
    }

    let reopened = open_directory(&path);
    assert_eq!(reopened.usernames().unwrap(), vec!["alice", "bob"]);
    reopened.authenticate("bob", "hunter22").unwrap();
}

#[test]
fn two_directories_on_one_file_keep_both_registrations() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.vault");
    let first = open_directory(&path);
    let second = open_directory(&path);

    first.register("alice", "Secret1!").unwrap();
    second.register("bob", "hunter22").unwrap();
    assert!(matches!(
        second.register("alice", "attacker-pw"),
        Err(SafePassError::UsernameTaken(_))
    ));

    let reopened = open_directory(&path);
    assert_eq!(reopened.usernames().unwrap(), vec!["alice", "bob"]);
    reopened.authenticate("alice", "Secret1!").unwrap();
}

#[test]
fn usernames_differing_only_in_case_collide() {
    let dir = TempDir::new().unwrap();
    let directory = open_directory(&dir.path().join("users.vault"));

    directory.register("alice", "Secret1!").unwrap();
    assert!(matches!(
        directory.register("Alice", "Secret1!"),
        Err(SafePassError::UsernameTaken(_))
    ));
    assert_eq!(directory.len().unwrap(), 1);
}

#[test]
fn directory_file_hides_passwords() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.vault");
    open_directory(&path).register("alice", "Secret1!").unwrap();

    let raw = std::fs::read(&path).unwrap();
    assert!(!contains_bytes(&raw, b"Secret1!"));
    assert!(!contains_bytes(&raw, b"alice"));
}

#[test]
fn directory_under_wrong_key_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.vault");
    open_directory(&path).register("alice", "Secret1!").unwrap();

    let other_key = Arc::new(EncryptionKey::new([0x99u8; 32]));
    assert!(matches!(
        AccountDirectory::open(&path, other_key, fast_params()),
        Err(SafePassError::DecryptionFailed)
    ));
}

#[test]
fn path_like_usernames_are_rejected() {
    let dir = TempDir::new().unwrap();
    let directory = open_directory(&dir.path().join("users.vault"));

    let too_long = "x".repeat(65);
    for bad in ["", "../etc", "a/b", ".hidden", "with space", too_long.as_str()] {
        assert!(
            matches!(
                directory.register(bad, "Secret1!"),
                Err(SafePassError::InvalidInput(_))
            ),
            "username {bad:?} should be rejected"
        );
    }
    assert!(directory.is_empty().unwrap());
}
