//! Inspecting and stopping a running instance through its pid file.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::instance::process::is_process_running;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fs;
use std::io;
use std::path::Path;

/// What the pid file says about an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    /// The recorded process is alive.
    Running(u32),
    /// A pid file exists but its process is gone.
    Stale(u32),
    /// No pid file exists.
    NotRunning,
}

/// Reads the pid recorded in a pid file.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns [`Error::InvalidPidFile`] if the file is empty or does not hold a
/// positive decimal process id, or an I/O error if it cannot be read.
pub fn read_pid_file<P: AsRef<Path>>(pid_file_path: P) -> Result<Option<u32>> {
    let pid_file_path = pid_file_path.as_ref();

    let contents = match fs::read_to_string(pid_file_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let pid_str = contents.trim();
    if pid_str.is_empty() {
        return Err(Error::InvalidPidFile {
            path: pid_file_path.to_path_buf(),
            reason: "pid file is empty".to_string(),
        });
    }

    match pid_str.parse::<u32>() {
        Ok(pid) if pid > 0 => Ok(Some(pid)),
        _ => Err(Error::InvalidPidFile {
            path: pid_file_path.to_path_buf(),
            reason: format!("'{}' is not a process id", pid_str),
        }),
    }
}

/// Reports whether the instance `name` is running according to its pid file.
///
/// # Errors
///
/// Returns an error if the pid file exists but cannot be read or parsed.
pub fn instance_status(config: &Config, name: &str) -> Result<InstanceStatus> {
    let status = match read_pid_file(config.pid_file_path(name))? {
        None => InstanceStatus::NotRunning,
        Some(pid) if is_process_running(pid) => InstanceStatus::Running(pid),
        Some(pid) => InstanceStatus::Stale(pid),
    };
    Ok(status)
}

/// Sends SIGTERM to the process recorded in the pid file of `name`.
///
/// A pid file naming a dead process is removed.
///
/// # Returns
///
/// Returns the pid that was signalled.
///
/// # Errors
///
/// Returns an error if:
/// - No pid file exists, or the recorded process is not running
/// - The pid file contains invalid data
/// - The process could not be signalled
pub fn stop_instance(config: &Config, name: &str) -> Result<u32> {
    let pid_file_path = config.pid_file_path(name);
    let pid = read_pid_file(&pid_file_path)?.ok_or_else(|| Error::NotRunning(name.to_string()))?;

    if !is_process_running(pid) {
        log::info!(
            "Process {} for {} is gone, removing stale pid file {}",
            pid,
            name,
            pid_file_path.display()
        );
        let _ = fs::remove_file(&pid_file_path);
        return Err(Error::NotRunning(name.to_string()));
    }

    let raw = i32::try_from(pid).map_err(|_| Error::InvalidPidFile {
        path: pid_file_path.clone(),
        reason: format!("{} is out of range", pid),
    })?;

    kill(Pid::from_raw(raw), Signal::SIGTERM).map_err(|source| Error::Signal { pid, source })?;
    log::info!("Sent SIGTERM to {} (pid {})", name, pid);

    Ok(pid)
}
