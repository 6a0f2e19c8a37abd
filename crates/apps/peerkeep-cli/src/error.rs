//! CLI error types.

use peerkeep_net::DiscoveryError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error enum wrapping all crate errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Discovery core error.
    #[error("{0}")]
    Discovery(#[from] DiscoveryError),

    /// IO error.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// User-facing error with actionable message.
    #[error("{0}")]
    User(String),

    /// Peer ID could not be parsed.
    #[error("Invalid peer ID: {0}")]
    InvalidPeerId(String),

    /// Config file already exists.
    #[error("Config file already exists: {}", .0.display())]
    ConfigExists(PathBuf),
}

impl CliError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a user-facing error.
    pub fn user(msg: impl Into<String>) -> Self {
        Self::User(msg.into())
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors: 1
            Self::User(_) | Self::InvalidPeerId(_) | Self::ConfigExists(_) => 1,
            // Config errors: 3
            Self::Config(_) | Self::Toml(_) | Self::Discovery(DiscoveryError::Config(_)) => 3,
            // Discovery errors: 5
            Self::Discovery(_) => 5,
            // IO errors: 9
            Self::Io(_) => 9,
            // JSON/format errors: 10
            Self::Json(_) => 10,
        }
    }

    /// Short stable code printed next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::Toml(_) => "config",
            Self::Discovery(e) => e.metric_labels().1,
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::User(_) => "usage",
            Self::InvalidPeerId(_) => "invalid_peer_id",
            Self::ConfigExists(_) => "config_exists",
        }
    }

    /// A hint for recovering from this error, if there is one.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) | Self::Toml(_) | Self::Discovery(DiscoveryError::Config(_)) => {
                Some("Check the config file, or run 'peerkeep config init --force' to reset it.")
            }
            Self::InvalidPeerId(_) => Some("Peer IDs are base58 multihashes such as '12D3KooW...'."),
            Self::ConfigExists(_) => Some("Pass --force to overwrite it."),
            _ => None,
        }
    }
}
