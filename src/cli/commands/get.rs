//! `safepass get`: print or copy a single site's password.

use crate::cli::output;
use crate::cli::{log_user_audit, Cli};
use crate::errors::{Result, SafePassError};

/// Execute the `get` command.
pub fn execute(cli: &Cli, site: &str, copy: bool) -> Result<()> {
    let service = crate::cli::login(cli)?;

    let password = service
        .retrieve(site)?
        .ok_or_else(|| SafePassError::CommandFailed(format!("no password stored for '{site}'")))?;
    let password = zeroize::Zeroizing::new(password);

    log_user_audit(&service, "get", Some(site), copy.then_some("clipboard"));

    if copy {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| SafePassError::CommandFailed(format!("clipboard unavailable: {e}")))?;
        clipboard
            .set_text(password.as_str())
            .map_err(|e| SafePassError::CommandFailed(format!("clipboard write: {e}")))?;
        output::success(&format!("Password for '{site}' copied to clipboard"));
    } else {
        println!("{}", password.as_str());
    }

    Ok(())
}
