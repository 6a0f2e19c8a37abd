//! Command-line interface for the Peerkeep discovery core.
//!
//! This crate provides the `peerkeep` binary. It does not run a node; it
//! manages the discovery configuration file and answers whether a peer's
//! addresses would be dialed under a given transport profile.
//!
//! # Quick Start
//!
//! ```bash
//! # Write the default configuration
//! peerkeep config init
//!
//! # Check a peer's addresses against the browser profile
//! peerkeep check 12D3KooW... /dns4/node.example/tcp/443/wss --profile browser
//! ```
//!
//! # Output Formats
//!
//! All commands support `--format`:
//!
//! - `human` (default): Human-readable with colors
//! - `json`: Machine-readable JSON
//!
//! # Configuration
//!
//! Configuration is loaded from the platform data directory
//! (`PEERKEEP_DATA_DIR` overrides it). Override the file with `--config`.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

// Re-export main types
pub use cli::{Cli, Commands, ConfigAction, OutputFormatArg, ProfileArg};
pub use config::CliConfig;
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, Render};
