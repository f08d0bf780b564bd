//! `safepass delete`: remove a site's password.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{log_user_audit, Cli};
use crate::errors::{Result, SafePassError};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, site: &str, force: bool) -> Result<()> {
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete the password for '{site}'?"))
            .default(false)
            .interact()
            .map_err(|e| SafePassError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let service = crate::cli::login(cli)?;

    if service.remove(site)? {
        log_user_audit(&service, "delete", Some(site), None);
        output::success(&format!("Deleted the password for '{site}'"));
    } else {
        output::info(&format!("No password stored for '{site}', nothing to delete."));
    }

    Ok(())
}
