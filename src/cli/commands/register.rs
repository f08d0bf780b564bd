//! `safepass register`: create a new account.

use crate::cli::output;
use crate::cli::{log_audit, open_service, prompt_new_password, resolve_username, Cli};
use crate::errors::Result;

/// Execute the `register` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let service = open_service(cli)?;
    let username = resolve_username(cli)?;
    let password = prompt_new_password()?;

    let account = service.register(&username, &password)?;

    log_audit(&service, "register", Some(&account.username), None, None);
    output::success(&format!("Account '{}' created", account.username));
    output::tip(&format!(
        "Store a password: safepass --user {} add <SITE>",
        account.username
    ));

    Ok(())
}
