use clap::Parser;
use safepass::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the diagnostics filter (e.g. `debug`).
const LOG_ENV: &str = "SAFEPASS_LOG";

fn main() {
    // Diagnostics go to stderr so stdout stays clean for `get`/`export`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Register => safepass::cli::commands::register::execute(&cli),
        Commands::Login => safepass::cli::commands::login::execute(&cli),
        Commands::Add {
            ref site,
            ref password,
            ref category,
        } => safepass::cli::commands::add::execute(
            &cli,
            site,
            password.as_deref(),
            category.as_deref(),
        ),
        Commands::Get { ref site, copy } => safepass::cli::commands::get::execute(&cli, site, copy),
        Commands::Delete { ref site, force } => {
            safepass::cli::commands::delete::execute(&cli, site, force)
        }
        Commands::Categorize {
            ref site,
            ref category,
        } => safepass::cli::commands::categorize::execute(&cli, site, category),
        Commands::List { ref category } => {
            safepass::cli::commands::list::execute(&cli, category.as_deref())
        }
        Commands::Export {
            ref format,
            ref output,
        } => safepass::cli::commands::export::execute(&cli, format, output.as_deref()),
        Commands::Import { ref file } => safepass::cli::commands::import_cmd::execute(&cli, file),
        #[cfg(feature = "audit-log")]
        Commands::Audit { last, ref since } => {
            safepass::cli::commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
        Commands::Completions { ref shell } => safepass::cli::commands::completions::execute(shell),
    };

    if let Err(e) = result {
        safepass::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
