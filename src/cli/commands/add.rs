//! `safepass add`: store or update a site's password.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{log_user_audit, Cli};
use crate::errors::{Result, SafePassError};

/// Execute the `add` command.
pub fn execute(cli: &Cli, site: &str, password: Option<&str>, category: Option<&str>) -> Result<()> {
    // Log in first so a piped master password and a piped site password
    // never compete for stdin.
    let service = crate::cli::login(cli)?;

    let secret = if let Some(p) = password {
        output::warning("Password provided on command line: it may appear in shell history.");
        Zeroizing::new(p.to_string())
    } else if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        Zeroizing::new(buf.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string())
    } else {
        Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt(format!("Password for {site}"))
                .interact()
                .map_err(|e| SafePassError::CommandFailed(format!("input prompt: {e}")))?,
        )
    };

    let existed = service.contains(site)?;
    service.add(site, &secret, category)?;
    let total = service.list_sites()?.len();

    let detail = match (existed, category) {
        (true, Some(c)) => format!("updated, category={c}"),
        (true, None) => "updated".to_string(),
        (false, Some(c)) => format!("added, category={c}"),
        (false, None) => "added".to_string(),
    };
    log_user_audit(&service, "add", Some(site), Some(&detail));

    let verb = if existed { "updated" } else { "added" };
    output::success(&format!("Password for '{site}' {verb} ({total} total)"));

    Ok(())
}
