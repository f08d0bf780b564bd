//! Cryptographic primitives for SafePass.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - Argon2id master-password hashing (`kdf`)
//! - The installation key and its HKDF sub-keys (`keys`)
//! - The persisted key file (`keystore`)

pub mod encryption;
pub mod kdf;
pub mod keys;
pub mod keystore;

pub use encryption::{decrypt, encrypt};
pub use kdf::{generate_salt, hash_password, verify_password, Argon2Params};
pub use keys::EncryptionKey;
pub use keystore::KeyStore;
