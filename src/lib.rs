//! Single instance enforcement for command-line programs.
//!
//! A program creates an [`InstanceGuard`] at startup and calls
//! [`InstanceGuard::lock`]. The guard takes an exclusive, non-blocking advisory
//! lock on `<lock_dir>/<name>.lock` and writes the process id to
//! `<run_dir>/<name>.pid`, where `name` is the program's file name without its
//! extension. A second instance gets [`Error::AlreadyRunning`] immediately.
//! [`InstanceGuard::unlock`] releases the lock and removes both files.
//!
//! Nothing in this library terminates the process; callers decide what to do
//! with an error, typically exiting with [`Error::exit_code`].
//!
//! ```no_run
//! use plock::{Config, InstanceGuard};
//!
//! fn main() -> plock::Result<()> {
//!     let mut guard = InstanceGuard::for_current_program(&Config::default())?;
//!     let pid = guard.lock()?;
//!     println!("running as {}", pid);
//!     guard.unlock()
//! }
//! ```

pub mod config;
pub mod error;
pub mod instance;
pub mod logging;

pub use config::{load_config, load_config_from_file, Config};
pub use error::{DirKind, Error, Result};
pub use instance::{
    derive_name, instance_status, is_process_running, read_pid_file, stop_instance,
    InstanceGuard, InstanceStatus,
};
pub use logging::init_logging;
