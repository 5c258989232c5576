//! Handles the logic for determining the configuration file path.

use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Configuration file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Returns the path to the configuration file
///
/// Uses the platform-specific application configuration directory:
/// - Linux: `$XDG_CONFIG_HOME/plock/config.json` or `$HOME/.config/plock/config.json`
/// - macOS: `$HOME/Library/Application Support/plock/config.json`
///
/// # Errors
///
/// Returns an error if the configuration directory cannot be determined
pub fn get_config_file_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "plock").ok_or_else(|| Error::Config {
        path: PathBuf::from(CONFIG_FILE_NAME),
        reason: "unable to determine a configuration directory for this platform".to_string(),
    })?;

    Ok(project_dirs.config_dir().join(CONFIG_FILE_NAME))
}
