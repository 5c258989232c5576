//! Provides functionality for checking if a process is running.

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Checks if a process with the given PID is currently running.
///
/// # Arguments
///
/// * `pid` - The process ID to check.
///
/// # Returns
///
/// Returns `true` if the process exists, `false` otherwise. A process owned
/// by another user still counts as running.
pub fn is_process_running(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}
