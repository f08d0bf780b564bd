//! Vault module: accounts and their encrypted credential stores.
//!
//! This module provides:
//! - Encrypted, versioned snapshot files (`format`)
//! - `CredentialEntry` and `EntryMetadata` types (`entry`)
//! - Per-account `CredentialStore` (`store`)
//! - The process-wide `AccountDirectory` (`directory`)
//! - `VaultService`, the session-aware facade over all of the above (`service`)

pub mod directory;
pub mod entry;
pub mod format;
pub mod service;
pub mod store;

// Re-export the most commonly used items.
pub use directory::{Account, AccountDirectory, StoredArgon2Params};
pub use entry::{CredentialEntry, EntryMetadata};
pub use service::VaultService;
pub use store::CredentialStore;
