//! Handles reading the configuration file.

use super::path::get_config_file_path;
use super::structure::Config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Loads configuration from the default configuration file
///
/// A missing configuration file, or a platform without a configuration
/// directory, yields the conventional directories.
///
/// # Errors
///
/// Returns an error if:
/// - File reading fails
/// - JSON parsing fails
pub fn load_config() -> Result<Config> {
    match get_config_file_path() {
        Ok(config_path) => load_config_from_file(config_path),
        Err(e) => {
            log::debug!("{}, using defaults", e);
            Ok(Config::default())
        }
    }
}

/// Loads configuration from a specific file
///
/// # Arguments
///
/// * `config_path` - Path to the JSON configuration file
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed
pub fn load_config_from_file<P: AsRef<Path>>(config_path: P) -> Result<Config> {
    let config_path = config_path.as_ref();

    if !config_path.exists() {
        log::debug!(
            "No configuration at {}, using defaults",
            config_path.display()
        );
        return Ok(Config::default());
    }

    let config_content = fs::read_to_string(config_path).map_err(|e| Error::Config {
        path: config_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let trimmed_content = config_content.trim();

    if trimmed_content.is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_json::from_str(trimmed_content).map_err(|e| Error::Config {
        path: config_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    log::debug!("Loaded configuration from {}", config_path.display());
    Ok(config)
}

/// Renders a configuration as pretty-printed JSON ending with a newline
///
/// # Errors
///
/// Returns an error if JSON serialization fails
pub fn render_config(config: &Config) -> Result<String> {
    let mut content = serde_json::to_string_pretty(config).map_err(|e| Error::Config {
        path: Path::new("<memory>").to_path_buf(),
        reason: e.to_string(),
    })?;

    if !content.ends_with('\n') {
        content.push('\n');
    }

    Ok(content)
}
