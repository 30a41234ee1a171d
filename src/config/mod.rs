//! Engine configuration
//!
//! A single JSON file. Every field has a default, so `{}` is a valid
//! configuration; `validate()` runs after parsing.
//!
//! ```json
//! {
//!   "database_path": "./mrm_status.db",
//!   "busy_timeout_ms": 5000,
//!   "auto_create_validation_for_major": true,
//!   "allow_direct_global_activation": false,
//!   "log_level": "info",
//!   "http": { "host": "127.0.0.1", "port": 8087, "cors_origins": [] }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::guard::ActivationPolicy;
use crate::http_server::HttpServerConfig;
use crate::observability::Severity;
use crate::workflow::WorkflowSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// How long a unit of work waits for the write lock
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Create and link an INTAKE validation request for every MAJOR version
    #[serde(default = "default_true")]
    pub auto_create_validation_for_major: bool,

    /// Permit DRAFT -> ACTIVE for GLOBAL versions with no validation request
    #[serde(default)]
    pub allow_direct_global_activation: bool,

    /// Minimum log severity: trace, info, warn or error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub http: HttpServerConfig,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./mrm_status.db")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            auto_create_validation_for_major: true,
            allow_direct_global_activation: false,
            log_level: default_log_level(),
            http: HttpServerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database_path must not be empty".into()));
        }

        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid("busy_timeout_ms must be > 0".into()));
        }

        self.log_severity().map_err(ConfigError::Invalid)?;

        if self.http.port == 0 {
            return Err(ConfigError::Invalid("http.port must be > 0".into()));
        }

        Ok(())
    }

    /// Write the default configuration, refusing to overwrite.
    pub fn write_default(path: &Path) -> ConfigResult<Self> {
        let config = Self::default();
        config.write_new(path)?;
        Ok(config)
    }

    /// Write this configuration to a file that must not exist yet.
    pub fn write_new(&self, path: &Path) -> ConfigResult<()> {
        if path.exists() {
            return Err(ConfigError::Invalid(format!(
                "config file {} already exists",
                path.display()
            )));
        }
        self.validate()?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn log_severity(&self) -> Result<Severity, String> {
        self.log_level.parse()
    }

    pub fn activation_policy(&self) -> ActivationPolicy {
        ActivationPolicy {
            allow_direct_global_activation: self.allow_direct_global_activation,
        }
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            auto_create_validation_for_major: self.auto_create_validation_for_major,
            activation: self.activation_policy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.auto_create_validation_for_major);
        assert!(!config.allow_direct_global_activation);
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = EngineConfig::from_json(r#"{"busy_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let err = EngineConfig::from_json(r#"{"log_level": "verbose"}"#).unwrap_err();
        assert!(err.to_string().contains("verbose"));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            EngineConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_activation_policy_follows_flag() {
        let config = EngineConfig::from_json(r#"{"allow_direct_global_activation": true}"#).unwrap();
        assert!(config.activation_policy().allow_direct_global_activation);
    }

    #[test]
    fn test_write_default_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mrm.json");

        let written = EngineConfig::write_default(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(written, loaded);

        assert!(EngineConfig::write_default(&path).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/mrm.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
