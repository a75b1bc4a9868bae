//! Configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority, applied by each binary)
//! 2. Environment variable (also applied by the binaries via clap `env`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: a warning is logged and the
//! compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default reCAPTCHA verification endpoint
pub const DEFAULT_CAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Qualification granted to workers who already took part
pub const DEFAULT_QUALIFICATION_TYPE_ID: &str = "3GNL8ZDCG6N1PUOYDZQY9HUQXUMIOJ";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Stimulus CSV served by the experiment
    #[serde(default = "default_stimuli_path")]
    pub stimuli_path: PathBuf,

    /// Raw JSON backups of submitted results are written here
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Public key the experiment page uses to request CAPTCHA tokens
    #[serde(default)]
    pub captcha_site_key: Option<String>,

    /// Server-side secret for CAPTCHA verification
    #[serde(default)]
    pub captcha_secret_key: Option<String>,

    #[serde(default = "default_captcha_verify_url")]
    pub captcha_verify_url: String,

    #[serde(default)]
    pub mturk: MturkConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Mechanical Turk requester credentials and endpoint
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MturkConfig {
    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<String>,

    #[serde(default = "default_mturk_region")]
    pub region: String,

    /// Overrides the regional requester endpoint (sandbox, testing)
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_qualification_type_id")]
    pub qualification_type_id: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("nlm_fb/data/nlm_fb.db")
}

fn default_stimuli_path() -> PathBuf {
    PathBuf::from("nlm_fb/data/expt/nlm_fb_stimuli.csv")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("nlm_fb/data/results/")
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_captcha_verify_url() -> String {
    DEFAULT_CAPTCHA_VERIFY_URL.to_string()
}

fn default_mturk_region() -> String {
    "us-east-1".to_string()
}

fn default_qualification_type_id() -> String {
    DEFAULT_QUALIFICATION_TYPE_ID.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            stimuli_path: default_stimuli_path(),
            results_dir: default_results_dir(),
            bind_address: default_bind_address(),
            port: default_port(),
            captcha_site_key: None,
            captcha_secret_key: None,
            captcha_verify_url: default_captcha_verify_url(),
            mturk: MturkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for MturkConfig {
    fn default() -> Self {
        Self {
            access_key_id: None,
            secret_access_key: None,
            region: default_mturk_region(),
            endpoint: None,
            qualification_type_id: default_qualification_type_id(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl MturkConfig {
    /// Both halves of the credential pair are present and non-blank
    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.access_key_id) && present(&self.secret_access_key)
    }
}

/// Default configuration file location: `~/.config/nlmfb/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("nlmfb").join("config.toml"))
}

/// Parse a TOML configuration string
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Load configuration from `path`, falling back to compiled defaults
///
/// A missing file yields defaults. A file that exists but cannot be
/// parsed is an error so a typo never silently reverts to defaults.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(p) => p,
        None => {
            warn!("Could not determine config directory, using compiled defaults");
            return Ok(TomlConfig::default());
        }
    };

    if !path.exists() {
        warn!("Config file not found at {}, using compiled defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config = parse_toml_config(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = parse_toml_config("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.port, 8000);
        assert_eq!(config.mturk.region, "us-east-1");
        assert_eq!(config.captcha_verify_url, DEFAULT_CAPTCHA_VERIFY_URL);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = parse_toml_config(
            r#"
            port = 9100
            captcha_secret_key = "s3cret"

            [mturk]
            access_key_id = "AKIA"
            secret_access_key = "shh"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.captcha_secret_key.as_deref(), Some("s3cret"));
        assert!(config.mturk.has_credentials());
        assert_eq!(config.mturk.qualification_type_id, DEFAULT_QUALIFICATION_TYPE_ID);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_blank_credentials_are_missing() {
        let mturk = MturkConfig {
            access_key_id: Some("  ".to_string()),
            secret_access_key: Some("x".to_string()),
            ..MturkConfig::default()
        };
        assert!(!mturk.has_credentials());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(matches!(parse_toml_config("port = \"abc\""), Err(Error::Config(_))));
    }
}
