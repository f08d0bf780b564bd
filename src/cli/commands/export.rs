//! `safepass export`: dump decrypted passwords.
//!
//! Supported formats:
//! - `env` (default): one `site=password` line per entry
//! - `json`: JSON object { "site": "password", ... }

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::cli::output;
use crate::cli::{log_user_audit, Cli};
use crate::errors::{Result, SafePassError};

/// Execute the `export` command.
pub fn execute(cli: &Cli, format: &str, output_path: Option<&str>) -> Result<()> {
    // Validate before asking for any password.
    if !matches!(format, "env" | "json") {
        return Err(SafePassError::InvalidInput(format!(
            "unknown export format '{format}': use 'env' or 'json'"
        )));
    }
    if let Some(dest) = output_path {
        check_destination(Path::new(dest))?;
    }

    let service = crate::cli::login(cli)?;
    let passwords = service.export_all()?;

    let content = zeroize::Zeroizing::new(match format {
        "json" => format_as_json(&passwords)?,
        _ => format_as_env(&passwords),
    });

    log_user_audit(
        &service,
        "export",
        None,
        Some(&format!("{} entries, format: {format}", passwords.len())),
    );

    match output_path {
        Some(dest) => {
            write_export(Path::new(dest), content.as_bytes())?;
            output::warning("The export file contains plaintext passwords. Delete it when done.");
            output::success(&format!(
                "Exported {} passwords to {dest} (format: {format})",
                passwords.len()
            ));
        }
        None => print!("{}", content.as_str()),
    }

    Ok(())
}

/// Refuse to overwrite the vault's own files.
fn check_destination(dest: &Path) -> Result<()> {
    if dest
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("vault") || ext.eq_ignore_ascii_case("key"))
    {
        return Err(SafePassError::InvalidInput(
            "refusing to export over a .vault or .key file".into(),
        ));
    }
    Ok(())
}

/// Write the export with owner-only permissions.
fn write_export(dest: &Path, data: &[u8]) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(dest)
        .map_err(|e| SafePassError::CommandFailed(format!("failed to write export file: {e}")))?;
    std::io::Write::write_all(&mut file, data)?;
    Ok(())
}

/// Format passwords as `site=password` lines.
///
/// Values with whitespace, quotes, `#`, `$` or newlines are double-quoted
/// and escaped.
fn format_as_env(passwords: &BTreeMap<String, String>) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    for (site, password) in passwords {
        let needs_quotes = password.is_empty()
            || password
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '$' | '\\'));
        if needs_quotes {
            let escaped = password
                .replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\n', "\\n");
            let _ = writeln!(out, "{site}=\"{escaped}\"");
        } else {
            let _ = writeln!(out, "{site}={password}");
        }
    }
    out
}

/// Format passwords as a pretty-printed JSON object.
fn format_as_json(passwords: &BTreeMap<String, String>) -> Result<String> {
    serde_json::to_string_pretty(passwords)
        .map_err(|e| SafePassError::SerializationError(format!("JSON export: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_format_is_sorted_by_site() {
        let mut passwords = BTreeMap::new();
        passwords.insert("b.example".into(), "two".into());
        passwords.insert("a.example".into(), "one".into());

        assert_eq!(format_as_env(&passwords), "a.example=one\nb.example=two\n");
    }

    #[test]
    fn env_format_quotes_awkward_values() {
        let mut passwords = BTreeMap::new();
        passwords.insert("s".into(), "has space".into());
        passwords.insert("t".into(), "pri$ce\"q".into());
        passwords.insert("u".into(), String::new());

        let out = format_as_env(&passwords);
        assert!(out.contains("s=\"has space\"\n"));
        assert!(out.contains("t=\"pri$ce\\\"q\"\n"));
        assert!(out.contains("u=\"\"\n"));
    }

    #[test]
    fn json_format_reads_back() {
        let mut passwords = BTreeMap::new();
        passwords.insert("example.com".into(), "s3cr3t".into());

        let out = format_as_json(&passwords).unwrap();
        let parsed: BTreeMap<String, String> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, passwords);
    }

    #[test]
    fn destination_guard_rejects_vault_files() {
        assert!(check_destination(Path::new("data/users.vault")).is_err());
        assert!(check_destination(Path::new("data/encryption.KEY")).is_err());
        assert!(check_destination(Path::new("backup.json")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn export_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("out.json");
        write_export(&dest, b"{}").unwrap();

        let mode = fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
