//! Integration tests for configuration loading
//!
//! - Missing TOML files do not cause failure (compiled defaults)
//! - Present TOML files override defaults field by field
//! - Malformed TOML files are reported rather than ignored

use nlmfb_common::config::{load_toml_config, TomlConfig};
use nlmfb_common::Error;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("does-not-exist.toml");

    let config = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_file_overrides_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
database_path = "/srv/nlmfb/expt.db"
stimuli_path = "/srv/nlmfb/stimuli.csv"
bind_address = "0.0.0.0"

[mturk]
endpoint = "https://mturk-requester-sandbox.us-east-1.amazonaws.com"

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config.database_path, PathBuf::from("/srv/nlmfb/expt.db"));
    assert_eq!(config.stimuli_path, PathBuf::from("/srv/nlmfb/stimuli.csv"));
    assert_eq!(config.bind_address, "0.0.0.0");
    assert_eq!(
        config.mturk.endpoint.as_deref(),
        Some("https://mturk-requester-sandbox.us-east-1.amazonaws.com")
    );
    assert!(!config.mturk.has_credentials());
    assert_eq!(config.logging.level, "debug");
    // Untouched fields keep their defaults
    assert_eq!(config.port, TomlConfig::default().port);
    assert_eq!(config.results_dir, TomlConfig::default().results_dir);
}

#[test]
fn test_malformed_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "port = [1, 2").unwrap();

    let result = load_toml_config(Some(&path));
    assert!(matches!(result, Err(Error::Config(_))));
}
