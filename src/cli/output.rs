//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::EntryMetadata;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of stored entries (Site, Category, Created, Updated).
pub fn print_entries_table(entries: &[EntryMetadata]) {
    if entries.is_empty() {
        info("No passwords stored yet.");
        tip("Run `safepass add <SITE>` to store your first password.");
        return;
    }

    println!("{}", entries_table(entries));
}

/// Build the entries table without printing it.
fn entries_table(entries: &[EntryMetadata]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Site", "Category", "Created", "Updated"]);

    for e in entries {
        table.add_row(vec![
            e.site.clone(),
            e.category.clone().unwrap_or_else(|| "-".to_string()),
            e.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            e.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    table
}

/// Print a plain list of site names, one per line.
pub fn print_site_list(sites: &[String]) {
    for site in sites {
        println!("  {site}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn table_shows_dash_for_uncategorized() {
        let now = Utc::now();
        let entries = vec![
            EntryMetadata {
                site: "github.com".into(),
                category: Some("work".into()),
                created_at: now,
                updated_at: now,
            },
            EntryMetadata {
                site: "bank.example".into(),
                category: None,
                created_at: now,
                updated_at: now,
            },
        ];

        let rendered = entries_table(&entries).to_string();
        assert!(rendered.contains("github.com"));
        assert!(rendered.contains("work"));
        assert!(rendered.contains("bank.example"));
        assert!(rendered.contains(" - "));
    }
}
