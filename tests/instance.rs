use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::{tempdir, TempDir};

struct Dirs {
    _root: TempDir,
    lock_dir: PathBuf,
    run_dir: PathBuf,
}

fn dirs() -> Dirs {
    let root = tempdir().unwrap();
    let lock_dir = root.path().join("lock");
    let run_dir = root.path().join("run");
    fs::create_dir(&lock_dir).unwrap();
    fs::create_dir(&run_dir).unwrap();
    Dirs {
        _root: root,
        lock_dir,
        run_dir,
    }
}

fn plock(dirs: &Dirs) -> Command {
    let mut cmd = Command::cargo_bin("plock").unwrap();
    cmd.arg("--lock-dir")
        .arg(&dirs.lock_dir)
        .arg("--run-dir")
        .arg(&dirs.run_dir);
    cmd
}

fn spawn_holder(dirs: &Dirs, name: &str, seconds: &str) -> Child {
    plock(dirs)
        .args(["run", "--name", name, "--", "sleep", seconds])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap()
}

/// Waits for a pid file to hold a pid, returning its contents.
fn wait_for_pid_file(path: &Path) -> String {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if let Ok(contents) = fs::read_to_string(path) {
            if !contents.is_empty() {
                return contents;
            }
        }
        thread::sleep(Duration::from_millis(20));
    }
    panic!("pid file {} never appeared", path.display());
}

#[test]
fn test_second_process_is_refused_until_first_unlocks() {
    let dirs = dirs();
    let pid_file = dirs.run_dir.join("svc.pid");
    let lock_file = dirs.lock_dir.join("svc.lock");

    // Process A takes the lock
    let mut a = spawn_holder(&dirs, "svc", "30");
    let a_pid = wait_for_pid_file(&pid_file);
    assert_eq!(a_pid, a.id().to_string());
    assert!(lock_file.exists());

    // Process B is refused immediately and leaves the pid file alone
    let started = Instant::now();
    plock(&dirs)
        .args(["run", "--name", "svc", "--", "true"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(format!(
            "already running on pid {}",
            a_pid
        )));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(fs::read_to_string(&pid_file).unwrap(), a_pid);

    plock(&dirs)
        .args(["status", "svc"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "svc is running on pid {}",
            a_pid
        )));

    // Stopping A forwards SIGTERM to its child, then A unlocks
    plock(&dirs)
        .args(["stop", "svc"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Stopped svc (pid {})", a_pid)));

    let status = a.wait().unwrap();
    assert_eq!(status.code(), Some(128 + 15));
    assert!(!pid_file.exists(), "pid file should be removed");
    assert!(!lock_file.exists(), "lock file should be removed");

    // B retried now succeeds
    plock(&dirs)
        .args(["run", "--name", "svc", "--", "true"])
        .assert()
        .success();
}

#[test]
fn test_concurrent_processes_exclude_each_other() {
    let dirs = dirs();

    let children: Vec<Child> = (0..4)
        .map(|_| spawn_holder(&dirs, "race", "2"))
        .collect();

    let codes: Vec<Option<i32>> = children
        .into_iter()
        .map(|mut child| child.wait().unwrap().code())
        .collect();

    let winners = codes.iter().filter(|c| **c == Some(0)).count();
    let refused = codes.iter().filter(|c| **c == Some(1)).count();
    assert_eq!(winners, 1, "exactly one process should run: {:?}", codes);
    assert_eq!(refused, 3, "the others should be refused: {:?}", codes);

    assert!(!dirs.run_dir.join("race.pid").exists());
    assert!(!dirs.lock_dir.join("race.lock").exists());
}

#[test]
fn test_distinct_names_run_side_by_side() {
    let dirs = dirs();

    let mut alpha = spawn_holder(&dirs, "alpha", "30");
    wait_for_pid_file(&dirs.run_dir.join("alpha.pid"));

    plock(&dirs)
        .args(["run", "--name", "beta", "--", "true"])
        .assert()
        .success();

    plock(&dirs).args(["stop", "alpha"]).assert().success();
    alpha.wait().unwrap();
}
