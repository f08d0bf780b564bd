use thiserror::Error;

/// All errors that can occur in SafePass.
#[derive(Debug, Error)]
pub enum SafePassError {
    // --- Storage errors ---
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    // --- Account errors ---
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Unknown user '{0}'")]
    UnknownUser(String),

    #[error("Invalid credentials: wrong master password")]
    InvalidCredentials,

    #[error("Not authenticated: log in first")]
    NotAuthenticated,

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Input / config errors ---
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config file error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Audit error: {0}")]
    AuditError(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

impl From<std::io::Error> for SafePassError {
    fn from(e: std::io::Error) -> Self {
        Self::StorageUnavailable(e.to_string())
    }
}

/// Convenience type alias for SafePass results.
pub type Result<T> = std::result::Result<T, SafePassError>;
