//! Error type shared by the guard, the configuration layer and the inspection helpers.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Which of the two required directories a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirKind {
    /// Directory holding the `.lock` files.
    Lock,
    /// Directory holding the `.pid` files.
    Run,
}

impl fmt::Display for DirKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirKind::Lock => f.write_str("lockfile"),
            DirKind::Run => f.write_str("pidfile"),
        }
    }
}

/// Core error type for plock operations
#[derive(Debug, Error)]
pub enum Error {
    /// A required directory is missing, not a directory, or not writable.
    #[error("cannot find a valid place to put the {kind}: {} is not a writable directory", .path.display())]
    EnvironmentUnavailable { kind: DirKind, path: PathBuf },

    /// No instance name can be derived from the program path.
    #[error("cannot derive an instance name from '{}'", .0.display())]
    InvalidProgramName(PathBuf),

    /// The advisory lock is held by another process.
    #[error("already running on pid {}", .holder.map_or_else(|| "unknown".to_string(), |p| p.to_string()))]
    AlreadyRunning {
        lock_file: PathBuf,
        holder: Option<u32>,
    },

    /// Creating, opening or locking the lock file failed for a reason other than contention.
    #[error("unexpected error locking {}: {source}", .path.display())]
    UnexpectedLock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Releasing the lock or removing one of the instance files failed.
    #[error("failed to release {}: {source}", .path.display())]
    Release {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} is not running")]
    NotRunning(String),

    #[error("invalid pid file {}: {reason}", .path.display())]
    InvalidPidFile { path: PathBuf, reason: String },

    #[error("failed to signal pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("invalid configuration {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Map errors to stable process exit codes.
    ///
    ///  1 - Already running / general failure
    ///  2 - Lock or run directory unavailable
    ///  3 - Unexpected lock-file error
    ///  4 - Instance not running
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::AlreadyRunning { .. } => 1,
            Error::EnvironmentUnavailable { .. } => 2,
            Error::UnexpectedLock { .. } => 3,
            Error::NotRunning(_) => 4,
            _ => 1,
        }
    }
}
