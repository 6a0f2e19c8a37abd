//! Configuration file commands.

use std::path::Path;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{ConfigInitOutput, ConfigShowOutput, OutputFormat, Render};

/// Write the default configuration to `path`.
pub fn config_init(path: &Path, force: bool, format: OutputFormat) -> CliResult<String> {
    let overwritten = path.exists();
    if overwritten && !force {
        return Err(CliError::ConfigExists(path.to_path_buf()));
    }

    CliConfig::default().save(path)?;

    let output = ConfigInitOutput {
        config_path: path.display().to_string(),
        overwritten,
    };
    Ok(output.render(format))
}

/// Show the effective configuration loaded from `path`.
pub fn config_show(path: &Path, config: &CliConfig, format: OutputFormat) -> CliResult<String> {
    let output = ConfigShowOutput {
        config_path: path.display().to_string(),
        exists: path.exists(),
        toml: config.to_toml()?,
        config: serde_json::to_value(config)?,
    };
    Ok(output.render(format))
}

/// Print the configuration path.
pub fn config_path(path: &Path, format: OutputFormat) -> CliResult<String> {
    Ok(match format {
        OutputFormat::Human => path.display().to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
            "config_path": path.display().to_string(),
        }))?,
    })
}
