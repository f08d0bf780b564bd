//! CredentialEntry and EntryMetadata types stored inside a vault.
//!
//! Each entry holds the site it belongs to, the encrypted password (as
//! raw bytes), an optional category label and creation/update
//! timestamps.  The `ciphertext` field uses custom serde helpers so it
//! serializes as a base64 string in JSON rather than a raw byte array.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::format::{base64_decode, base64_encode};

/// A single encrypted password stored in a credential store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialEntry {
    /// The site this password belongs to (e.g. "example.com").
    pub site: String,

    /// The encrypted password bytes (nonce + ciphertext + tag).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,

    /// Optional user-defined label such as "Work" or "Personal".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// When this entry was first added.
    pub created_at: DateTime<Utc>,

    /// When the password or category last changed.
    pub updated_at: DateTime<Utc>,
}

/// Lightweight metadata about an entry (no ciphertext).
///
/// Returned by `CredentialStore::list` so callers can display sites and
/// categories without touching any encrypted bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    pub site: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&CredentialEntry> for EntryMetadata {
    fn from(entry: &CredentialEntry) -> Self {
        Self {
            site: entry.site.clone(),
            category: entry.category.clone(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}
