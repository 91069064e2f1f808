mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Nadesiko3 source analysis toolchain.
#[derive(Parser)]
#[command(name = "nako", version, about = "Nadesiko3 source analysis toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Configuration file (default: ./nako.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum number of diagnostics kept per file
    #[arg(long, global = true)]
    problems_limit: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse .nako3 files with their imports and report diagnostics
    Check {
        /// Source files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the token stream of a .nako3 file
    Tokens {
        /// Path to the .nako3 source file
        file: PathBuf,
    },

    /// Print the declarations of a .nako3 file
    Decls {
        /// Path to the .nako3 source file
        file: PathBuf,
    },

    /// Validate or produce plugin declaration catalogs
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
}

#[derive(Subcommand)]
enum CatalogCommands {
    /// Check a plugin export JSON file for structural problems
    Validate {
        /// Path to the plugin export JSON file
        file: PathBuf,
    },

    /// Export the public declarations of a .nako3 file in catalog form
    Export {
        /// Path to the .nako3 source file
        file: PathBuf,
    },

    /// Print the built-in system command catalog
    System,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let settings = match config::load(cli.config.as_deref(), cli.problems_limit) {
        Ok(s) => s,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(2);
        }
    };

    match cli.command {
        Commands::Check { files } => {
            commands::check::cmd_check(&files, settings, cli.output, cli.quiet);
        }
        Commands::Tokens { file } => {
            commands::tokens::cmd_tokens(&file, settings, cli.output, cli.quiet);
        }
        Commands::Decls { file } => {
            commands::decls::cmd_decls(&file, settings, cli.output, cli.quiet);
        }
        Commands::Catalog { command } => match command {
            CatalogCommands::Validate { file } => {
                commands::catalog::cmd_validate(&file, cli.output, cli.quiet);
            }
            CatalogCommands::Export { file } => {
                commands::catalog::cmd_export(&file, settings, cli.output, cli.quiet);
            }
            CatalogCommands::System => {
                commands::catalog::cmd_system();
            }
        },
    }
}

/// Log to stderr; `RUST_LOG` overrides the default level.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
