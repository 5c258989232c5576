//! Single instance enforcement for command-line programs.
//!
//! An [`InstanceGuard`] takes an exclusive, non-blocking advisory lock on
//! `<lock_dir>/<name>.lock` and records the holder's pid in
//! `<run_dir>/<name>.pid` so scripts can find the running instance.

mod guard;
mod name;
mod process;
mod stop;

pub use guard::InstanceGuard;
pub use name::derive_name;
pub use process::is_process_running;
pub use stop::{instance_status, read_pid_file, stop_instance, InstanceStatus};
