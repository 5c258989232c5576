use clap::{ArgAction, Parser, Subcommand};
use nix::sys::signal::{kill, SigSet, Signal};
use nix::unistd::Pid;
use plock::config::render_config;
use plock::{
    init_logging, instance_status, load_config, load_config_from_file, stop_instance, Config,
    Error, InstanceGuard, InstanceStatus,
};
use std::ffi::OsString;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{self, Command, ExitStatus};
use std::thread;

#[derive(Parser)]
#[command(name = "plock")]
#[command(about = "Run a program as a single instance with a lock file and pid file")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for lock files (default /run/lock)
    #[arg(long, global = true, value_name = "DIR")]
    lock_dir: Option<PathBuf>,

    /// Directory for pid files (default /run)
    #[arg(long, global = true, value_name = "DIR")]
    run_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lock, run a command, then unlock when it exits
    Run {
        /// Instance name (defaults to the command's file name without extension)
        #[arg(long)]
        name: Option<String>,

        /// Command to run, with its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<OsString>,
    },
    /// Report whether an instance is running
    Status {
        /// Instance name
        name: String,
    },
    /// Send SIGTERM to a running instance
    Stop {
        /// Instance name
        name: String,
    },
    /// Print the lock file and pid file paths of an instance
    Paths {
        /// Instance name
        name: String,
    },
    /// Print the effective configuration
    Config,
}

/// Signals relayed from plock to the wrapped command.
const FORWARDED_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP];

/// Exit status reported when the instance is not running.
const NOT_RUNNING: i32 = 4;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    let code = match &cli.command {
        Commands::Run { name, command } => {
            match run_command(&config, name.as_deref(), command) {
                Ok(code) => code,
                Err(e) => fail(&e),
            }
        }
        Commands::Status { name } => match instance_status(&config, name) {
            Ok(InstanceStatus::Running(pid)) => {
                println!("{} is running on pid {}", name, pid);
                0
            }
            Ok(InstanceStatus::Stale(pid)) => {
                println!("{} is not running (stale pid file for pid {})", name, pid);
                NOT_RUNNING
            }
            Ok(InstanceStatus::NotRunning) => {
                println!("{} is not running", name);
                NOT_RUNNING
            }
            Err(e) => fail(&e),
        },
        Commands::Stop { name } => match stop_instance(&config, name) {
            Ok(pid) => {
                println!("Stopped {} (pid {})", name, pid);
                0
            }
            Err(e) => fail(&e),
        },
        Commands::Paths { name } => match InstanceGuard::with_name(&config, name) {
            Ok(guard) => {
                println!("lock file: {}", guard.lock_file_path().display());
                println!("pid file: {}", guard.pid_file_path().display());
                0
            }
            Err(e) => fail(&e),
        },
        Commands::Config => match render_config(&config) {
            Ok(rendered) => {
                print!("{}", rendered);
                0
            }
            Err(e) => fail(&e),
        },
    };

    process::exit(code);
}

fn fail(e: &Error) -> ! {
    eprintln!("Error: {}", e);
    process::exit(e.exit_code());
}

/// Loads the configuration file, then applies command-line directory overrides.
fn resolve_config(cli: &Cli) -> Result<Config, Error> {
    let mut config = match &cli.config {
        Some(path) => load_config_from_file(path)?,
        None => load_config()?,
    };
    config.override_dirs(cli.lock_dir.clone(), cli.run_dir.clone());
    Ok(config)
}

/// Holds the instance lock for the lifetime of `command` and returns its exit code.
fn run_command(config: &Config, name: Option<&str>, command: &[OsString]) -> Result<i32, Error> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| Error::InvalidProgramName(PathBuf::new()))?;

    let mut guard = match name {
        Some(name) => InstanceGuard::with_name(config, name)?,
        None => InstanceGuard::new(config, program)?,
    };

    // Blocked before the pid file is published and drained by the forwarder.
    // Children start with an empty signal mask.
    let mut signals = SigSet::empty();
    for signal in FORWARDED_SIGNALS {
        signals.add(signal);
    }
    signals.thread_block().map_err(io::Error::from)?;

    let pid = guard.lock()?;
    log::info!("{} locked to pid {}", guard.name(), pid);

    let mut child = match Command::new(program).args(args).spawn() {
        Ok(child) => child,
        Err(e) => {
            log::error!("Failed to start {}: {}", program.to_string_lossy(), e);
            guard.unlock()?;
            return Err(e.into());
        }
    };
    log::debug!("Started {} as pid {}", program.to_string_lossy(), child.id());

    spawn_signal_forwarder(signals, child.id());

    let status = child.wait();
    guard.unlock()?;
    let status = status?;
    log::debug!("{} exited with {}", program.to_string_lossy(), status);

    Ok(exit_code_of(status))
}

/// Relays every signal in `signals` to `child` until the process exits.
fn spawn_signal_forwarder(signals: SigSet, child: u32) {
    let child = Pid::from_raw(child as i32);
    thread::spawn(move || {
        while let Ok(signal) = signals.wait() {
            log::info!("Forwarding {:?} to pid {}", signal, child);
            if let Err(e) = kill(child, signal) {
                log::debug!("Could not forward {:?}: {}", signal, e);
            }
        }
    });
}

/// Exit code of the wrapped command, using the shell's 128 + signal convention.
fn exit_code_of(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_with_hyphen_args() {
        let cli = Cli::try_parse_from([
            "plock", "--lock-dir", "/tmp/l", "run", "--name", "svc", "--", "sleep", "-x", "5",
        ])
        .unwrap();

        assert_eq!(cli.lock_dir, Some(PathBuf::from("/tmp/l")));
        match cli.command {
            Commands::Run { name, command } => {
                assert_eq!(name.as_deref(), Some("svc"));
                let expected: Vec<OsString> = ["sleep", "-x", "5"].into_iter().map(OsString::from).collect();
                assert_eq!(command, expected);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_run_requires_command() {
        assert!(Cli::try_parse_from(["plock", "run"]).is_err());
    }

    #[test]
    fn test_exit_code_of() {
        assert_eq!(exit_code_of(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code_of(ExitStatus::from_raw(3 << 8)), 3);
        assert_eq!(exit_code_of(ExitStatus::from_raw(15)), 143);
    }
}
