//! Logger setup for the `plock` binary.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Environment variable holding an `env_logger` filter that overrides the flags.
pub const LOG_ENV: &str = "PLOCK_LOG";

/// Maps `-q` / `-v` counts to a level filter; info when neither is given.
pub fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Installs a stderr logger. Calling it more than once is harmless.
pub fn init_logging(verbose: u8, quiet: bool) {
    let _ = Builder::new()
        .filter_level(level_for(verbose, quiet))
        .parse_env(Env::new().filter(LOG_ENV))
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
