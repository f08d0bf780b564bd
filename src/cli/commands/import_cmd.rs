//! `safepass import`: bulk-add passwords from a JSON file.
//!
//! The file must hold a single JSON object mapping site names to
//! password strings, the same shape `safepass export --format json`
//! produces.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::cli::output;
use crate::cli::{log_user_audit, Cli};
use crate::errors::{Result, SafePassError};

/// Execute the `import` command.
pub fn execute(cli: &Cli, file_path: &str) -> Result<()> {
    let source = Path::new(file_path);
    if !source.exists() {
        return Err(SafePassError::CommandFailed(format!(
            "import file not found: {}",
            source.display()
        )));
    }

    let passwords = parse_json_file(source)?;
    if passwords.is_empty() {
        output::warning("No passwords found in the import file.");
        return Ok(());
    }

    let service = crate::cli::login(cli)?;
    let count = service.import(
        passwords
            .iter()
            .map(|(site, password)| (site.as_str(), password.as_str())),
    )?;

    for site in passwords.keys() {
        output::info(&format!("  + {site}"));
    }

    log_user_audit(
        &service,
        "import",
        None,
        Some(&format!("{count} entries from {}", source.display())),
    );
    output::success(&format!(
        "Imported {count} passwords from {}",
        source.display()
    ));

    Ok(())
}

/// Parse a JSON object of `site -> password` strings.
fn parse_json_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = zeroize::Zeroizing::new(
        fs::read_to_string(path)
            .map_err(|e| SafePassError::CommandFailed(format!("failed to read file: {e}")))?,
    );

    let map: BTreeMap<String, serde_json::Value> = serde_json::from_str(&content)
        .map_err(|e| SafePassError::InvalidInput(format!("invalid JSON: {e}")))?;

    map.into_iter()
        .map(|(site, value)| match value {
            serde_json::Value::String(password) => Ok((site, password)),
            _ => Err(SafePassError::InvalidInput(format!(
                "password for '{site}' must be a JSON string"
            ))),
        })
        .collect()
}
