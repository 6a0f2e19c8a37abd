//! Peerkeep CLI binary entry point.

use clap::Parser;
use colored::Colorize;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use peerkeep_cli::{
    cli::{Cli, Commands, ConfigAction},
    commands,
    config::{default_config_path, CliConfig},
    error::{CliError, CliResult},
    output::OutputFormat,
};

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on --verbose flag or RUST_LOG env var
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if cli.verbose || has_rust_log {
        let mut filter = EnvFilter::from_default_env();
        if cli.verbose {
            if let Ok(directive) = "peerkeep=debug".parse() {
                filter = filter.add_directive(directive);
            }
        }
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    match run(cli) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            print_error(&e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Print a user-friendly error message with error code and recovery hint.
fn print_error(e: &CliError) {
    eprintln!("{} [{}]: {}", "Error".red().bold(), e.code().yellow(), e);

    if let Some(suggestion) = e.suggestion() {
        eprintln!("{}: {}", "Hint".cyan(), suggestion);
    }
}

/// Load the configuration and apply its display settings.
fn load_config(path: &Path) -> CliResult<CliConfig> {
    let config = CliConfig::load(path)?;
    if !config.display.color {
        colored::control::set_override(false);
    }
    Ok(config)
}

fn run(cli: Cli) -> CliResult<String> {
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let format: OutputFormat = cli.format.into();

    match cli.command {
        // Neither needs a readable config file
        Commands::Config {
            action: ConfigAction::Init { force },
        } => commands::config_init(&config_path, force, format),
        Commands::Config {
            action: ConfigAction::Path,
        } => commands::config_path(&config_path, format),

        Commands::Config {
            action: ConfigAction::Show,
        } => {
            let config = load_config(&config_path)?;
            commands::config_show(&config_path, &config, format)
        }

        Commands::Check {
            peer,
            addresses,
            profile,
            transports,
        } => {
            let config = load_config(&config_path)?;
            commands::check(&config, format, &peer, &addresses, profile, transports)
        }
    }
}
