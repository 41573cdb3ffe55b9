use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Main error type covering every stage of an XJC invocation
#[derive(Error, Debug)]
pub enum XjcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} for {url} - {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Request timeout: {url} after {timeout_seconds} seconds")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Resource not found: {path}")]
    ResourceNotFound { path: PathBuf },

    #[error("Unsupported resource locator: {locator} - {reason}")]
    UnsupportedResource { locator: String, reason: String },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("xjc finished with {status}\n{command_line}")]
    Invocation {
        status: ExitStatusKind,
        command_line: String,
    },

    #[error("Post-processing failed: {path} - {details}")]
    PostProcessing { path: PathBuf, details: String },

    #[error("Concurrent operation error: {details}")]
    Concurrency { details: String },
}

/// How a failed tool run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatusKind {
    /// The tool returned or exited with this non-zero code
    Code(i32),
    /// The subprocess was terminated by a signal
    Signal,
    /// The embedded tool panicked
    Panic(String),
}

impl std::fmt::Display for ExitStatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitStatusKind::Code(code) => write!(f, "code: {}", code),
            ExitStatusKind::Signal => write!(f, "termination by signal"),
            ExitStatusKind::Panic(message) => write!(f, "panic: {}", message),
        }
    }
}

impl XjcError {
    /// Errors raised before any resource is fetched or process is started
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, XjcError::Config(_))
    }

    /// Errors raised while resolving schema or binding resources
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            XjcError::ResourceNotFound { .. }
                | XjcError::UnsupportedResource { .. }
                | XjcError::Http(_)
                | XjcError::HttpStatus { .. }
                | XjcError::Timeout { .. }
        )
    }
}

impl From<ConfigError> for XjcError {
    fn from(err: ConfigError) -> Self {
        XjcError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, XjcError>;
