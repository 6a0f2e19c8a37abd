//! Output formatting for CLI.

use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use 'human' or 'json'.", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Trait for renderable output.
pub trait Render {
    /// Render as human-readable string.
    fn render_human(&self) -> String;

    /// Render as JSON string.
    fn render_json(&self) -> String;

    /// Render in the specified format.
    fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Human => self.render_human(),
            OutputFormat::Json => self.render_json(),
        }
    }
}

// =============================================================================
// Output Types
// =============================================================================

/// Output for `config init`.
#[derive(Debug, Serialize)]
pub struct ConfigInitOutput {
    pub config_path: String,
    pub overwritten: bool,
}

impl Render for ConfigInitOutput {
    fn render_human(&self) -> String {
        let verb = if self.overwritten { "overwritten" } else { "written" };
        format!(
            "{} {}",
            format!("Default configuration {}:", verb).green().bold(),
            self.config_path
        )
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Output for `config show`.
#[derive(Debug, Serialize)]
pub struct ConfigShowOutput {
    pub config_path: String,
    pub exists: bool,
    /// The effective configuration as TOML.
    #[serde(skip)]
    pub toml: String,
    /// The effective configuration as JSON.
    pub config: serde_json::Value,
}

impl Render for ConfigShowOutput {
    fn render_human(&self) -> String {
        let source = if self.exists {
            self.config_path.clone()
        } else {
            format!("{} (not found, showing defaults)", self.config_path)
        };
        format!("{} {}\n\n{}", "Config:".cyan().bold(), source, self.toml.trim_end())
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// One address as seen by `check`.
#[derive(Debug, Serialize)]
pub struct AddressCheck {
    pub address: String,
    pub dialable: bool,
    /// The fully qualified dial target, if the address parses.
    pub dial_target: Option<String>,
}

/// Output for `check`.
#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub peer_id: String,
    pub profile: String,
    pub supported_transports: Vec<String>,
    pub addresses: Vec<AddressCheck>,
    /// Why the peer cannot be dialed, if it cannot.
    pub undialable_reason: Option<String>,
}

impl CheckOutput {
    /// Returns true if at least one address would be dialed.
    pub fn is_dialable(&self) -> bool {
        self.undialable_reason.is_none()
    }
}

impl Render for CheckOutput {
    fn render_human(&self) -> String {
        let mut lines = vec![
            format!("{} {}", "Peer:".bold(), self.peer_id),
            format!(
                "{} {} ({})",
                "Profile:".bold(),
                self.profile,
                self.supported_transports.join(", ")
            ),
            String::new(),
        ];

        for check in &self.addresses {
            let line = match (&check.dial_target, check.dialable) {
                (Some(target), true) => format!("  {} {}", "✓".green(), target),
                (None, true) => format!("  {} {} (malformed)", "✗".red(), check.address),
                (_, false) => format!("  {} {} (unsupported)", "✗".red(), check.address.dimmed()),
            };
            lines.push(line);
        }
        if self.addresses.is_empty() {
            lines.push(format!("  {}", "(no addresses)".dimmed()));
        }

        lines.push(String::new());
        match &self.undialable_reason {
            None => lines.push(format!("{}", "Dialable".green().bold())),
            Some(reason) => lines.push(format!("{} {}", "Not dialable:".red().bold(), reason)),
        }
        lines.join("\n")
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
