//! `safepass login`: verify credentials and summarize the vault.

use std::collections::BTreeSet;

use crate::cli::output;
use crate::cli::{log_user_audit, Cli};
use crate::errors::Result;

/// Execute the `login` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let service = crate::cli::login(cli)?;
    let entries = service.list_entries()?;

    let categories: BTreeSet<&str> = entries
        .iter()
        .filter_map(|e| e.category.as_deref())
        .collect();

    log_user_audit(&service, "login", None, None);
    output::success(&format!(
        "Logged in as '{}'",
        service.current_user().unwrap_or_default()
    ));
    output::info(&format!(
        "{} password(s) stored in {} categor{}",
        entries.len(),
        categories.len(),
        if categories.len() == 1 { "y" } else { "ies" }
    ));

    Ok(())
}
