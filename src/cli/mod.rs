//! CLI module: Clap argument parser, output helpers, and command implementations.
//!
//! Every invocation opens the vault, logs in (when the command needs an
//! account), runs one operation and exits.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{Result, SafePassError};
use crate::vault::VaultService;

/// Minimum master password length for new accounts.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable consulted before prompting for the master password.
pub const PASSWORD_ENV: &str = "SAFEPASS_PASSWORD";

/// SafePass CLI: local encrypted password vault.
#[derive(Parser)]
#[command(
    name = "safepass",
    about = "Local encrypted password vault with per-user accounts",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory holding the key, accounts and vaults
    #[arg(long, env = "SAFEPASS_DATA_DIR", default_value = "data", global = true)]
    pub data_dir: PathBuf,

    /// Account to act as (prompted for when omitted)
    #[arg(short, long, env = "SAFEPASS_USER", global = true)]
    pub user: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new account
    Register,

    /// Check credentials and show a vault summary
    Login,

    /// Add or update a site's password
    Add {
        /// Site identifier (e.g. github.com)
        site: String,
        /// Password (omit for piped input or an interactive prompt)
        password: Option<String>,
        /// Category label to attach
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Print a site's password
    Get {
        /// Site identifier
        site: String,
        /// Copy to the clipboard instead of printing
        #[arg(short, long)]
        copy: bool,
    },

    /// Delete a site's password
    Delete {
        /// Site identifier
        site: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Attach a category to a stored site
    Categorize {
        /// Site identifier
        site: String,
        /// Category label
        category: String,
    },

    /// List stored sites
    List {
        /// Only show sites in this category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Export decrypted passwords to a file or stdout
    Export {
        /// Output format: env (default) or json
        #[arg(short, long, default_value = "env")]
        format: String,

        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import passwords from a JSON file ({"site": "password", ...})
    Import {
        /// Path to the file to import
        file: String,
    },

    /// View the audit log of vault operations
    #[cfg(feature = "audit-log")]
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load settings from the data directory and open the vault.
pub fn open_service(cli: &Cli) -> Result<VaultService> {
    let settings = Settings::load(&cli.data_dir)?;
    VaultService::open(settings)
}

/// Open the vault and log in as the selected user.
///
/// The caller gets a service in the authenticated state.
pub fn login(cli: &Cli) -> Result<VaultService> {
    let service = open_service(cli)?;
    let username = resolve_username(cli)?;
    let password = prompt_password()?;

    match service.login(&username, &password) {
        Ok(_) => Ok(service),
        Err(e) => {
            log_audit(&service, "login-failed", Some(&username), None, None);
            Err(e)
        }
    }
}

/// The `--user` flag, or an interactive prompt when it was omitted.
pub fn resolve_username(cli: &Cli) -> Result<String> {
    if let Some(user) = &cli.user {
        return Ok(user.clone());
    }

    let name: String = dialoguer::Input::new()
        .with_prompt("Username")
        .interact_text()
        .map_err(|e| SafePassError::CommandFailed(format!("username prompt: {e}")))?;
    Ok(name.trim().to_string())
}

/// Get the master password, trying in order:
/// 1. `SAFEPASS_PASSWORD` env var (scripts, CI)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Master password")
        .interact()
        .map_err(|e| SafePassError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new master password with confirmation (used by `register`).
///
/// Also respects `SAFEPASS_PASSWORD`.  Enforces a minimum length.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        check_password_strength(&pw)?;
        return Ok(pw);
    }

    loop {
        let password = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose master password")
                .with_confirmation(
                    "Confirm master password",
                    "Passwords do not match, try again",
                )
                .interact()
                .map_err(|e| SafePassError::CommandFailed(format!("password prompt: {e}")))?,
        );

        if let Err(e) = check_password_strength(&password) {
            output::warning(&format!("{e}. Try again."));
            continue;
        }

        return Ok(password);
    }
}

/// Reject master passwords shorter than [`MIN_PASSWORD_LEN`] characters.
pub fn check_password_strength(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(SafePassError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn password_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Record an audit event for the current invocation.
///
/// A no-op when the crate is built without the `audit-log` feature.
pub fn log_audit(
    service: &VaultService,
    operation: &str,
    username: Option<&str>,
    site: Option<&str>,
    details: Option<&str>,
) {
    #[cfg(feature = "audit-log")]
    crate::audit::log_audit(service.settings(), operation, username, site, details);

    #[cfg(not(feature = "audit-log"))]
    let _ = (service, operation, username, site, details);
}

/// Audit an operation performed by the logged-in account.
pub fn log_user_audit(
    service: &VaultService,
    operation: &str,
    site: Option<&str>,
    details: Option<&str>,
) {
    let user = service.current_user();
    log_audit(service, operation, user.as_deref(), site, details);
}
