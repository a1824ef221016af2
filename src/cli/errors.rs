//! CLI-specific error types

use std::fmt;
use std::io;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// File or stdin/stdout failure
    IoError,
    /// Schema, request or config content is malformed
    InputInvalid,
    /// The request was rejected by the query builder
    QueryFailed,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::IoError => "VQ_CLI_IO_ERROR",
            Self::InputInvalid => "VQ_CLI_INPUT_INVALID",
            Self::QueryFailed => "VQ_CLI_QUERY_FAILED",
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn input_invalid(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InputInvalid, msg)
    }

    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::QueryFailed, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::input_invalid(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::input_invalid(e.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;
