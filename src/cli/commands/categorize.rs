//! `safepass categorize`: attach a category label to a stored site.

use crate::cli::output;
use crate::cli::{log_user_audit, Cli};
use crate::errors::{Result, SafePassError};

/// Execute the `categorize` command.
pub fn execute(cli: &Cli, site: &str, category: &str) -> Result<()> {
    let service = crate::cli::login(cli)?;

    if !service.categorize(site, category)? {
        return Err(SafePassError::CommandFailed(format!(
            "no password stored for '{site}'"
        )));
    }

    log_user_audit(&service, "categorize", Some(site), Some(category));
    output::success(&format!("'{site}' is now in category '{category}'"));

    Ok(())
}
