//! CLI command implementations.

pub mod check;
pub mod config;

// Re-export command handlers
pub use check::check;
pub use config::{config_init, config_path, config_show};
