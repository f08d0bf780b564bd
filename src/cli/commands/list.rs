//! `safepass list`: show stored sites.

use crate::cli::output;
use crate::cli::Cli;
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli, category: Option<&str>) -> Result<()> {
    let service = crate::cli::login(cli)?;
    let user = service.current_user().unwrap_or_default();

    match category {
        Some(category) => {
            let sites = service.list_by_category(category)?;
            if sites.is_empty() {
                output::info(&format!("No sites in category '{category}'."));
                return Ok(());
            }
            output::info(&format!("{} site(s) in category '{category}':", sites.len()));
            output::print_site_list(&sites);
        }
        None => {
            let entries = service.list_entries()?;
            output::info(&format!("{user}: {} password(s)", entries.len()));
            output::print_entries_table(&entries);
        }
    }

    Ok(())
}
