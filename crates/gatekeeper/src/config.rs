//! Configuration management for Gatekeeper.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use gatekeeper_common::GatekeeperError;
use gatekeeper_common::constants::{
    DEFAULT_CHARSET, DEFAULT_MAX_CODE_LEN, DEFAULT_MIN_CODE_LEN, DEFAULT_NAMESPACE,
    DEFAULT_PEPPER_FILE, DEFAULT_PEPPER_SIZE, DEFAULT_REDIS_URL, DEFAULT_SALT_LEN,
    MAX_EXPIRY_SECS,
};

/// Host configuration for the `gatekeeper` tool
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis connection URL for the session store
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Challenge protocol configuration
    #[serde(default)]
    pub captcha: CaptchaConfig,
}

/// Challenge protocol configuration.
///
/// Set once at startup and read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    /// Salt length in bytes
    #[serde(default = "default_salt_len")]
    pub salt_len: usize,

    /// Characters codes are drawn from (ASCII only)
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Shortest generated code
    #[serde(default = "default_min_length")]
    pub min_length: usize,

    /// Longest generated code (inclusive)
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Challenge lifetime in seconds; unset means challenges never expire
    #[serde(default)]
    pub expiry_secs: Option<u64>,

    /// Size of a newly created pepper file in bytes
    #[serde(default = "default_pepper_size")]
    pub pepper_size: usize,

    /// Pepper file location
    #[serde(default = "default_pepper_file")]
    pub pepper_file: PathBuf,

    /// Storage slot name; records live under {namespace}:{identity}
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            salt_len: default_salt_len(),
            charset: default_charset(),
            min_length: default_min_length(),
            max_length: default_max_length(),
            expiry_secs: None,
            pepper_size: default_pepper_size(),
            pepper_file: default_pepper_file(),
            namespace: default_namespace(),
        }
    }
}

impl CaptchaConfig {
    /// Challenge lifetime, if any
    pub fn expiry(&self) -> Option<Duration> {
        self.expiry_secs.map(Duration::from_secs)
    }

    /// Reject settings the protocol cannot work with
    pub fn validate(&self) -> Result<(), GatekeeperError> {
        if self.salt_len == 0 {
            return Err(GatekeeperError::Config("salt_len must be at least 1".into()));
        }
        if self.charset.is_empty() {
            return Err(GatekeeperError::Config("charset must not be empty".into()));
        }
        if !self.charset.is_ascii() {
            return Err(GatekeeperError::Config("charset must be ASCII".into()));
        }
        if self.min_length == 0 || self.min_length > self.max_length {
            return Err(GatekeeperError::Config(format!(
                "invalid code length range {}..={}",
                self.min_length, self.max_length
            )));
        }
        if self.pepper_size == 0 {
            return Err(GatekeeperError::Config("pepper_size must be at least 1".into()));
        }
        if self.expiry_secs == Some(0) {
            return Err(GatekeeperError::Config(
                "expiry_secs of 0 would expire every challenge; omit it to disable expiry".into(),
            ));
        }
        if let Some(secs) = self.expiry_secs.filter(|&secs| secs > MAX_EXPIRY_SECS) {
            return Err(GatekeeperError::Config(format!(
                "expiry_secs {secs} exceeds the maximum of {MAX_EXPIRY_SECS}"
            )));
        }
        if self.namespace.is_empty() {
            return Err(GatekeeperError::Config("namespace must not be empty".into()));
        }
        Ok(())
    }
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_salt_len() -> usize { DEFAULT_SALT_LEN }
fn default_charset() -> String { DEFAULT_CHARSET.to_string() }
fn default_min_length() -> usize { DEFAULT_MIN_CODE_LEN }
fn default_max_length() -> usize { DEFAULT_MAX_CODE_LEN }
fn default_pepper_size() -> usize { DEFAULT_PEPPER_SIZE }
fn default_pepper_file() -> PathBuf { PathBuf::from(DEFAULT_PEPPER_FILE) }
fn default_namespace() -> String { DEFAULT_NAMESPACE.to_string() }

impl AppConfig {
    /// Load configuration from an optional file plus `GATEKEEPER__*` environment overrides
    pub fn load(config_path: &str) -> Result<Self> {
        let mut builder = config::Config::builder();

        if Path::new(config_path).exists() {
            builder = builder.add_source(config::File::with_name(config_path));
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix("GATEKEEPER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("Failed to load config")?
            .try_deserialize()
            .context("Failed to parse config")?;

        config.captcha.validate().context("Invalid captcha configuration")?;

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            captcha: CaptchaConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CaptchaConfig::default();
        assert_eq!(config.salt_len, 32);
        assert_eq!((config.min_length, config.max_length), (4, 8));
        assert_eq!(config.pepper_size, 2048);
        assert_eq!(config.pepper_file, PathBuf::from("captcha_pepper"));
        assert!(config.expiry().is_none());
        assert!(config.charset.contains('@'));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let config = CaptchaConfig {
            min_length: 9,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CaptchaConfig {
            min_length: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_ascii_charset() {
        let config = CaptchaConfig {
            charset: "abcé".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(GatekeeperError::Config(_))));
    }

    #[test]
    fn test_validate_caps_expiry() {
        let config = CaptchaConfig {
            expiry_secs: Some(u64::MAX),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(GatekeeperError::Config(_))));

        let config = CaptchaConfig {
            expiry_secs: Some(MAX_EXPIRY_SECS),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = CaptchaConfig {
            expiry_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gatekeeper.toml");
        std::fs::write(
            &path,
            r#"
redis_url = "redis://cache:6379"

[captcha]
salt_len = 16
expiry_secs = 60
namespace = "login"
"#,
        )
        .unwrap();

        let config = AppConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.redis_url, "redis://cache:6379");
        assert_eq!(config.captcha.salt_len, 16);
        assert_eq!(config.captcha.expiry(), Some(Duration::from_secs(60)));
        assert_eq!(config.captcha.namespace, "login");
        assert_eq!(config.captcha.max_length, 8);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AppConfig::load("/nonexistent/gatekeeper.toml").unwrap();
        assert_eq!(config.captcha.salt_len, 32);
    }
}
