//! `safepass completions`: generate shell completion scripts.
//!
//! Usage:
//!   safepass completions bash > ~/.bash_completion.d/safepass
//!   safepass completions zsh
//!   safepass completions fish

use std::io;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::errors::{Result, SafePassError};

/// Execute the `completions` command.
pub fn execute(shell: &str) -> Result<()> {
    let shell = parse_shell(shell)?;
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "safepass", &mut io::stdout());
    Ok(())
}

/// Parse a shell name into a `Shell`.
fn parse_shell(name: &str) -> Result<Shell> {
    match name.to_lowercase().as_str() {
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        "fish" => Ok(Shell::Fish),
        "powershell" | "ps" => Ok(Shell::PowerShell),
        "elvish" => Ok(Shell::Elvish),
        other => Err(SafePassError::InvalidInput(format!(
            "unknown shell '{other}': supported are bash, zsh, fish, powershell, elvish"
        ))),
    }
}
