//! CLI Entry Point for iokit
//!
//! Provides command-line access to:
//! - Argument forms: show the arguments described in a TOML schema in a native window
//!   and print the confirmed values as JSON
//! - Log location: print where script runs write their logs for the current settings
//!
//! # Usage
//!
//! ```bash
//! iokit form schema.toml --title "Nightly backup"
//! iokit log-dir --config config/iokit.toml
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iokit::argument::ArgumentSet;
use iokit::config::ScriptSettings;
use iokit::{gui, tracing_init};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "iokit")]
#[command(about = "Argument forms and self-logging script runs", long_about = None)]
struct Cli {
    /// Settings file (defaults to config/iokit.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a form for the arguments in a TOML schema and print the values as JSON
    Form {
        /// Path to a schema with [[argument]] tables
        schema: PathBuf,

        /// Window title
        #[arg(long, default_value = "Arguments")]
        title: String,
    },

    /// Print the directory script runs log into
    LogDir,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => ScriptSettings::load_from(path),
        None => ScriptSettings::load(),
    }
    .context("Failed to load settings")?;

    tracing_init::init_from_settings(&settings).context("Failed to initialize tracing")?;

    match cli.command {
        Commands::Form { schema, title } => show_form(schema, &title),
        Commands::LogDir => {
            println!("{}", settings.resolve_logs_dir()?.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn show_form(schema: PathBuf, title: &str) -> Result<ExitCode> {
    let arguments: Vec<_> = ArgumentSet::load(&schema)
        .with_context(|| format!("Failed to load schema {}", schema.display()))?
        .build()?
        .into_iter()
        .map(|argument| argument.shared())
        .collect();

    tracing::info!(count = arguments.len(), schema = %schema.display(), "Showing argument form");

    match gui::collect_arguments(title, &arguments)? {
        Some(values) => {
            println!("{}", serde_json::to_string_pretty(&values)?);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("Cancelled");
            Ok(ExitCode::FAILURE)
        }
    }
}
