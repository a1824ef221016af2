//! Engine configuration
//!
//! Loaded from a JSON file; every field has a default so an empty object
//! is a valid config.
//!
//! Error codes:
//! - VQ_CONFIG_INVALID
//! - VQ_CONFIG_IO

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::executor::{ResultSettings, RunnerSettings};
use crate::observability::Severity;
use crate::planner::DialectKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    VqConfigInvalid,
    VqConfigIo,
}

impl ConfigErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigErrorCode::VqConfigInvalid => "VQ_CONFIG_INVALID",
            ConfigErrorCode::VqConfigIo => "VQ_CONFIG_IO",
        }
    }
}

impl fmt::Display for ConfigErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug)]
pub struct ConfigError {
    code: ConfigErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            code: ConfigErrorCode::VqConfigInvalid,
            message: message.into(),
            source: None,
        }
    }

    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: ConfigErrorCode::VqConfigIo,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn code(&self) -> ConfigErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker pool bound, i.e. max concurrently running runners
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Result queue slots per query result
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_connection_retry_interval_ms")]
    pub connection_retry_interval_ms: u64,

    #[serde(default = "default_execution_poll_interval_ms")]
    pub execution_poll_interval_ms: u64,

    #[serde(default = "default_consumer_poll_timeout_ms")]
    pub consumer_poll_timeout_ms: u64,

    #[serde(default = "default_start_grace_ms")]
    pub start_grace_ms: u64,

    /// Bound on waiting for a connection from an exhausted pool.
    /// Unset retries until the query is closed.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,

    /// How long dropping the pool waits for in-flight runners
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    #[serde(default)]
    pub dialect: DialectKind,

    #[serde(default)]
    pub log_level: Severity,
}

fn default_pool_size() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_connection_retry_interval_ms() -> u64 {
    100
}

fn default_execution_poll_interval_ms() -> u64 {
    50
}

fn default_consumer_poll_timeout_ms() -> u64 {
    100
}

fn default_start_grace_ms() -> u64 {
    10
}

fn default_shutdown_timeout_ms() -> u64 {
    5000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            queue_capacity: default_queue_capacity(),
            connection_retry_interval_ms: default_connection_retry_interval_ms(),
            execution_poll_interval_ms: default_execution_poll_interval_ms(),
            consumer_poll_timeout_ms: default_consumer_poll_timeout_ms(),
            start_grace_ms: default_start_grace_ms(),
            connect_timeout_ms: None,
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            dialect: DialectKind::default(),
            log_level: Severity::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| ConfigError::io(format!("cannot read {}", path.display()), e))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(text)
            .map_err(|e| ConfigError::invalid(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.pool_size == 0 {
            return Err(ConfigError::invalid("pool_size must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::invalid("queue_capacity must be at least 1"));
        }
        let intervals = [
            ("connection_retry_interval_ms", self.connection_retry_interval_ms),
            ("execution_poll_interval_ms", self.execution_poll_interval_ms),
            ("consumer_poll_timeout_ms", self.consumer_poll_timeout_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::invalid(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }

    pub fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            connection_retry_interval: Duration::from_millis(self.connection_retry_interval_ms),
            execution_poll_interval: Duration::from_millis(self.execution_poll_interval_ms),
            connect_timeout: self.connect_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn result_settings(&self) -> ResultSettings {
        ResultSettings {
            queue_capacity: self.queue_capacity,
            consumer_poll_timeout: Duration::from_millis(self.consumer_poll_timeout_ms),
            start_grace: Duration::from_millis(self.start_grace_ms),
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.connect_timeout_ms, None);
        assert_eq!(config.dialect, DialectKind::Impala);
        assert_eq!(config.log_level, Severity::Info);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"pool_size": 4, "dialect": "duckdb", "log_level": "trace",
                "connect_timeout_ms": 2500}}"#
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.dialect, DialectKind::Duckdb);
        assert_eq!(config.log_level, Severity::Trace);
        assert_eq!(
            config.runner_settings().connect_timeout,
            Some(Duration::from_millis(2500))
        );
        assert_eq!(config.queue_capacity, 1000);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::VqConfigIo);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_validation() {
        for json in [
            r#"{"pool_size": 0}"#,
            r#"{"queue_capacity": 0}"#,
            r#"{"execution_poll_interval_ms": 0}"#,
            r#"{"pool_size": "two"}"#,
        ] {
            let err = EngineConfig::from_json(json).unwrap_err();
            assert_eq!(err.code(), ConfigErrorCode::VqConfigInvalid, "{}", json);
        }
    }

    #[test]
    fn test_settings_conversion() {
        let config = EngineConfig::default();
        let result = config.result_settings();
        assert_eq!(result.queue_capacity, 1000);
        assert_eq!(result.consumer_poll_timeout, Duration::from_millis(100));
        assert_eq!(config.runner_settings().execution_poll_interval, Duration::from_millis(50));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
    }
}
