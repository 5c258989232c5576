//! Provides the `InstanceGuard` struct for enforcing a single running instance of a program.

use crate::config::Config;
use crate::error::{DirKind, Error, Result};
use crate::instance::name::derive_name;
use crate::instance::stop::read_pid_file;
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use nix::unistd::{access, AccessFlags};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

/// Permission bits of a newly created lock file.
const LOCK_FILE_MODE: u32 = 0o600;

/// Reopens allowed when the lock file is replaced between open and lock.
const MAX_LOCK_ATTEMPTS: usize = 8;

/// Single instance guard made of an advisory lock file and a pid file.
///
/// Both paths are fixed at construction. The lock file handle is only present
/// while the lock is held.
#[derive(Debug)]
pub struct InstanceGuard {
    /// Decimal process id captured at construction.
    pid: String,
    /// Name namespacing both instance files.
    name: String,
    lock_dir: PathBuf,
    run_dir: PathBuf,
    lock_file_path: PathBuf,
    pid_file_path: PathBuf,
    /// The locked lock file handle.
    flock: Option<Flock<File>>,
}

impl InstanceGuard {
    /// Creates a guard for the program at `program`, named after its file name.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Either configured directory is missing or not writable
    /// - No name can be derived from `program`
    pub fn new<P: AsRef<Path>>(config: &Config, program: P) -> Result<Self> {
        let program = program.as_ref();
        let name =
            derive_name(program).ok_or_else(|| Error::InvalidProgramName(program.to_path_buf()))?;
        Self::with_name(config, &name)
    }

    /// Creates a guard for the running executable, named after `argv[0]`.
    ///
    /// # Errors
    ///
    /// See [`InstanceGuard::new`].
    pub fn for_current_program(config: &Config) -> Result<Self> {
        let program = std::env::args_os()
            .next()
            .map(PathBuf::from)
            .or_else(|| std::env::current_exe().ok())
            .unwrap_or_default();
        Self::new(config, program)
    }

    /// Creates a guard using an explicit instance name.
    ///
    /// Nothing is created on disk; the directories are only checked.
    ///
    /// # Errors
    ///
    /// Returns an error if either configured directory is missing or not
    /// writable, or if `name` cannot be used as a file name.
    pub fn with_name(config: &Config, name: &str) -> Result<Self> {
        let lock_dir = validate_dir(&config.lock_dir, DirKind::Lock)?;
        let run_dir = validate_dir(&config.run_dir, DirKind::Run)?;

        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(Error::InvalidProgramName(PathBuf::from(name)));
        }

        let lock_file_path = lock_dir.join(format!("{}.lock", name));
        let pid_file_path = run_dir.join(format!("{}.pid", name));

        Ok(Self {
            pid: std::process::id().to_string(),
            name: name.to_string(),
            lock_dir,
            run_dir,
            lock_file_path,
            pid_file_path,
            flock: None,
        })
    }

    /// Acquires the lock and publishes the pid file.
    ///
    /// Returns the current process id in decimal form. Calling this again on a
    /// guard that already holds the lock returns the same id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`] if another process holds the lock, with
    /// the holder's pid when its pid file is readable, or
    /// [`Error::UnexpectedLock`] if the lock file cannot be created, opened or
    /// locked for any other reason. No pid file is written in either case.
    pub fn lock(&mut self) -> Result<String> {
        if self.flock.is_some() {
            return Ok(self.pid.clone());
        }

        match self.acquire() {
            Ok(()) => {
                self.publish_pid();
                Ok(self.pid.clone())
            }
            Err(Error::AlreadyRunning { lock_file, .. }) => {
                let holder = read_pid_file(&self.pid_file_path).ok().flatten();
                log::error!(
                    "Trying to start {}, but already running on pid {}",
                    self.name,
                    holder.map_or_else(|| "unknown".to_string(), |pid| pid.to_string())
                );
                Err(Error::AlreadyRunning { lock_file, holder })
            }
            Err(e) => Err(e),
        }
    }

    /// Removes the pid file, then the lock file, then releases the lock.
    ///
    /// Both files are unlinked while the lock is still held. A guard that never
    /// acquired the lock leaves the instance files alone.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing instance file cannot be removed or if
    /// unlocking fails.
    pub fn unlock(mut self) -> Result<()> {
        let Some(flock) = self.flock.take() else {
            log::debug!("{} was never locked, nothing to release", self.name);
            return Ok(());
        };

        self.remove_files()?;

        let file = flock.unlock().map_err(|(_, errno)| Error::Release {
            path: self.lock_file_path.clone(),
            source: io::Error::from(errno),
        })?;
        drop(file);
        log::debug!("Lock file [{}] unlocked", self.lock_file_path.display());

        Ok(())
    }

    /// Removes whichever of the pid file and lock file exist, pid file first.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be removed.
    pub(super) fn remove_files(&self) -> Result<()> {
        remove_if_exists(&self.pid_file_path)?;
        remove_if_exists(&self.lock_file_path)
    }

    fn acquire(&mut self) -> Result<()> {
        for _ in 0..MAX_LOCK_ATTEMPTS {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .mode(LOCK_FILE_MODE)
                .open(&self.lock_file_path)
                .map_err(|e| self.unexpected(e))?;

            match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(flock) => {
                    if !self.is_current_lock_file(&flock)? {
                        // Locked an inode a previous holder already unlinked
                        log::debug!(
                            "Lock file [{}] was replaced while locking, reopening",
                            self.lock_file_path.display()
                        );
                        continue;
                    }
                    log::debug!(
                        "Lock file [{}] locked to PID [{}]",
                        self.lock_file_path.display(),
                        self.pid
                    );
                    self.flock = Some(flock);
                    return Ok(());
                }
                Err((_, errno)) if errno == Errno::EWOULDBLOCK => {
                    return Err(self.held_elsewhere());
                }
                Err((_, errno)) => return Err(self.unexpected(io::Error::from(errno))),
            }
        }

        Err(self.held_elsewhere())
    }

    /// Checks that the locked descriptor is still the file at `lock_file_path`.
    fn is_current_lock_file(&self, locked: &File) -> Result<bool> {
        let held = locked.metadata().map_err(|e| self.unexpected(e))?;
        match fs::metadata(&self.lock_file_path) {
            Ok(on_disk) => Ok(on_disk.dev() == held.dev() && on_disk.ino() == held.ino()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.unexpected(e)),
        }
    }

    fn held_elsewhere(&self) -> Error {
        log::error!(
            "Lock file {} is held by another process",
            self.lock_file_path.display()
        );
        Error::AlreadyRunning {
            lock_file: self.lock_file_path.clone(),
            holder: None,
        }
    }

    fn unexpected(&self, source: io::Error) -> Error {
        log::error!(
            "General error trying to lock process to file {}: {}",
            self.lock_file_path.display(),
            source
        );
        Error::UnexpectedLock {
            path: self.lock_file_path.clone(),
            source,
        }
    }

    /// Writes the pid file. Failures are logged only: the lock, not the pid
    /// file, is what guarantees exclusivity.
    fn publish_pid(&self) {
        match fs::write(&self.pid_file_path, &self.pid) {
            Ok(()) => log::debug!(
                "PID file [{}] created for pid [{}]",
                self.pid_file_path.display(),
                self.pid
            ),
            Err(e) => log::error!(
                "Error writing pid file {}: {}",
                self.pid_file_path.display(),
                e
            ),
        }
    }

    /// Returns the decimal process id this guard publishes.
    pub fn pid(&self) -> &str {
        &self.pid
    }

    /// Returns the instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Returns the path to the lock file.
    pub fn lock_file_path(&self) -> &Path {
        &self.lock_file_path
    }

    /// Returns the path to the pid file.
    pub fn pid_file_path(&self) -> &Path {
        &self.pid_file_path
    }

    /// Returns `true` while this guard holds the lock.
    pub fn is_locked(&self) -> bool {
        self.flock.is_some()
    }
}

/// Checks that `dir` exists, is a directory and is writable by the current user.
fn validate_dir(dir: &Path, kind: DirKind) -> Result<PathBuf> {
    if dir.is_dir() && access(dir, AccessFlags::W_OK).is_ok() {
        if dir.is_absolute() {
            return Ok(dir.to_path_buf());
        }
        if let Ok(cwd) = std::env::current_dir() {
            return Ok(cwd.join(dir));
        }
    }

    log::error!(
        "Cannot find a valid place to put the {}: {} is not a writable directory",
        kind,
        dir.display()
    );
    Err(Error::EnvironmentUnavailable {
        kind,
        path: dir.to_path_buf(),
    })
}

fn remove_if_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("Removed [{}]", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Release {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
