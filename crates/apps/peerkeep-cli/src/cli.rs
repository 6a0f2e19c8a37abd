//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Peerkeep discovery CLI.
#[derive(Parser, Debug)]
#[command(name = "peerkeep")]
#[command(author = "Peerkeep Contributors")]
#[command(version)]
#[command(about = "Inspect peer discovery configuration and address dialability")]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (human or json).
    #[arg(short, long, global = true, default_value = "human")]
    pub format: OutputFormatArg,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Output format argument for clap.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormatArg {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Transport profile argument for clap.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ProfileArg {
    /// Secure and relay transports only.
    Browser,
    /// All native transports.
    Native,
}

/// CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check which of a peer's addresses would be dialed.
    Check {
        /// Peer ID (base58).
        peer: String,

        /// Candidate multiaddresses.
        addresses: Vec<String>,

        /// Transport profile to check against (defaults to the configured one).
        #[arg(short, long, conflicts_with = "transports")]
        profile: Option<ProfileArg>,

        /// Explicit transport tokens, comma separated (e.g. "tcp,quic-v1").
        #[arg(short, long, value_delimiter = ',')]
        transports: Vec<String>,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write the default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration.
    Show,

    /// Print the configuration file path.
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check_with_transports() {
        let cli = Cli::parse_from([
            "peerkeep",
            "--format",
            "json",
            "check",
            "12D3KooWPeer",
            "/ip4/1.2.3.4/tcp/4001",
            "--transports",
            "tcp,quic-v1",
        ]);

        assert!(matches!(cli.format, OutputFormatArg::Json));
        match cli.command {
            Commands::Check {
                peer,
                addresses,
                profile,
                transports,
            } => {
                assert_eq!(peer, "12D3KooWPeer");
                assert_eq!(addresses, vec!["/ip4/1.2.3.4/tcp/4001"]);
                assert!(profile.is_none());
                assert_eq!(transports, vec!["tcp", "quic-v1"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_profile_conflicts_with_transports() {
        let result = Cli::try_parse_from([
            "peerkeep",
            "check",
            "peer",
            "--profile",
            "browser",
            "--transports",
            "tcp",
        ]);
        assert!(result.is_err());
    }
}
