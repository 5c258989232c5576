//! Configuration of the lock and run directories.
//!
//! The conventional locations (`/run/lock` and `/run`) only appear as the
//! defaults of [`Config`]; everything else receives its directories explicitly.

pub mod io;
pub mod path;
pub mod structure;

pub use io::{load_config, load_config_from_file, render_config};
pub use path::get_config_file_path;
pub use structure::{Config, DEFAULT_LOCK_DIR, DEFAULT_RUN_DIR};

#[cfg(test)]
mod tests {
    use super::{load_config_from_file, render_config, Config};
    use crate::error::Error;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_config_defaults() {
        let config = Config::new();
        assert_eq!(config.lock_dir, PathBuf::from("/run/lock"));
        assert_eq!(config.run_dir, PathBuf::from("/run"));
    }

    #[test]
    fn test_instance_file_paths() {
        let config = Config::with_dirs("/tmp/locks", "/tmp/run");
        assert_eq!(
            config.lock_file_path("myservice"),
            PathBuf::from("/tmp/locks/myservice.lock")
        );
        assert_eq!(
            config.pid_file_path("myservice"),
            PathBuf::from("/tmp/run/myservice.pid")
        );
    }

    #[test]
    fn test_override_dirs() {
        let mut config = Config::new();
        config.override_dirs(Some(PathBuf::from("/var/lock")), None);
        assert_eq!(config.lock_dir, PathBuf::from("/var/lock"));
        assert_eq!(config.run_dir, PathBuf::from("/run"));
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config_from_file(dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_empty_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, "  \n").unwrap();

        let config = load_config_from_file(&config_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_partial_file_keeps_other_default() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, r#"{ "lock_dir": "/srv/locks" }"#).unwrap();

        let config = load_config_from_file(&config_path).unwrap();
        assert_eq!(config.lock_dir, PathBuf::from("/srv/locks"));
        assert_eq!(config.run_dir, PathBuf::from("/run"));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, "{ not json").unwrap();

        let err = load_config_from_file(&config_path).unwrap_err();
        match err {
            Error::Config { path, .. } => assert_eq!(path, config_path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_render_config() {
        let config = Config::with_dirs("/a", "/b");
        let rendered = render_config(&config).unwrap();
        assert!(rendered.ends_with('\n'));
        assert!(rendered.contains("\"lock_dir\": \"/a\""));
        assert!(rendered.contains("\"run_dir\": \"/b\""));
    }
}
