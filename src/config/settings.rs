use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::Argon2Params;
use crate::errors::{Result, SafePassError};

/// Installation configuration, loaded from `<data_dir>/safepass.toml`.
///
/// Every field has a sensible default so SafePass works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding every SafePass file.  Not read from the TOML
    /// file; it is where the TOML file is looked up.
    #[serde(skip)]
    pub data_dir: PathBuf,

    /// File name of the installation encryption key.
    #[serde(default = "default_key_file_name")]
    pub key_file_name: String,

    /// File name of the encrypted account directory.
    #[serde(default = "default_directory_file_name")]
    pub directory_file_name: String,

    /// Sub-directory (relative to `data_dir`) for per-account vaults.
    #[serde(default = "default_vaults_dir")]
    pub vaults_dir: String,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_key_file_name() -> String {
    "encryption.key".to_string()
}

fn default_directory_file_name() -> String {
    "users.vault".to_string()
}

fn default_vaults_dir() -> String {
    "vaults".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            key_file_name: default_key_file_name(),
            directory_file_name: default_directory_file_name(),
            vaults_dir: default_vaults_dir(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the data directory.
    pub const FILE_NAME: &'static str = "safepass.toml";

    /// Name of the audit database in the data directory.
    pub const AUDIT_FILE_NAME: &'static str = "audit.db";

    /// Default settings rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load settings from `<data_dir>/safepass.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::with_data_dir(data_dir));
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let mut settings: Settings = toml::from_str(&contents).map_err(|e| {
            SafePassError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;
        settings.data_dir = data_dir.to_path_buf();
        settings.validate()?;

        Ok(settings)
    }

    /// Reject file names that would escape the data directory or land on
    /// another SafePass file.
    ///
    /// Names are compared ignoring ASCII case, since the data directory
    /// may sit on a case-insensitive filesystem.
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("key_file_name", self.key_file_name.as_str()),
            ("directory_file_name", self.directory_file_name.as_str()),
            ("vaults_dir", self.vaults_dir.as_str()),
        ];

        for (field, value) in names {
            if value.is_empty()
                || value.contains('/')
                || value.contains('\\')
                || value == "."
                || value == ".."
            {
                return Err(SafePassError::ConfigError(format!(
                    "{field} must be a plain file name (got '{value}')"
                )));
            }
            if let Some(reserved) = [Self::FILE_NAME, Self::AUDIT_FILE_NAME]
                .into_iter()
                .find(|r| value.eq_ignore_ascii_case(r))
            {
                return Err(SafePassError::ConfigError(format!(
                    "{field} cannot be '{value}': {reserved} is reserved"
                )));
            }
        }

        for (i, (field, value)) in names.iter().enumerate() {
            if let Some((other, _)) = names[i + 1..]
                .iter()
                .find(|(_, v)| v.eq_ignore_ascii_case(value))
            {
                return Err(SafePassError::ConfigError(format!(
                    "{field} and {other} must differ (both are '{value}')"
                )));
            }
        }
        Ok(())
    }

    /// Path of the installation key file.
    ///
    /// Example: `data/encryption.key`
    pub fn key_path(&self) -> PathBuf {
        self.data_dir.join(&self.key_file_name)
    }

    /// Path of the account directory file.
    ///
    /// Example: `data/users.vault`
    pub fn directory_path(&self) -> PathBuf {
        self.data_dir.join(&self.directory_file_name)
    }

    /// Path of one account's credential file.
    ///
    /// Example: `data/vaults/alice.vault`
    pub fn credentials_path(&self, username: &str) -> PathBuf {
        self.data_dir
            .join(&self.vaults_dir)
            .join(format!("{username}.vault"))
    }

    /// Path of the audit database.
    pub fn audit_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
