//! Defines the `Config` struct and its implementation.

use std::path::{Path, PathBuf};

/// Conventional directory for lock files.
pub const DEFAULT_LOCK_DIR: &str = "/run/lock";

/// Conventional directory for transient runtime files such as pid files.
pub const DEFAULT_RUN_DIR: &str = "/run";

/// Directories used to place an instance's lock file and pid file
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory where `<name>.lock` is created
    pub lock_dir: PathBuf,
    /// Directory where `<name>.pid` is written
    pub run_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_dir: PathBuf::from(DEFAULT_LOCK_DIR),
            run_dir: PathBuf::from(DEFAULT_RUN_DIR),
        }
    }
}

impl Config {
    /// Creates a configuration with the conventional directories
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration using the given directories
    ///
    /// # Arguments
    ///
    /// * `lock_dir` - Directory for lock files
    /// * `run_dir` - Directory for pid files
    pub fn with_dirs<L: AsRef<Path>, R: AsRef<Path>>(lock_dir: L, run_dir: R) -> Self {
        Self {
            lock_dir: lock_dir.as_ref().to_path_buf(),
            run_dir: run_dir.as_ref().to_path_buf(),
        }
    }

    /// Replaces whichever directories are given, keeping the others.
    pub fn override_dirs(&mut self, lock_dir: Option<PathBuf>, run_dir: Option<PathBuf>) {
        if let Some(dir) = lock_dir {
            self.lock_dir = dir;
        }
        if let Some(dir) = run_dir {
            self.run_dir = dir;
        }
    }

    /// Path of the lock file for an instance name
    pub fn lock_file_path(&self, name: &str) -> PathBuf {
        self.lock_dir.join(format!("{}.lock", name))
    }

    /// Path of the pid file for an instance name
    pub fn pid_file_path(&self, name: &str) -> PathBuf {
        self.run_dir.join(format!("{}.pid", name))
    }
}
