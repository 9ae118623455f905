//! Error types shared across sqscale crates.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for configuration loading and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for collaborator calls.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors raised while loading or validating configuration.
///
/// Every variant is fatal at startup; none can occur once the poll loop runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors returned by external collaborators (metric source, queue depth
/// source, replica controller).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no datapoints returned for {metric}")]
    NoDatapoints { metric: String },

    #[error("{source_name} request failed: {message}")]
    Request {
        source_name: &'static str,
        message: String,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("malformed {what}: {value:?}")]
    Malformed { what: &'static str, value: String },
}

impl SourceError {
    /// Shorthand for a failed request to a named backend.
    pub fn request(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::Request {
            source_name,
            message: message.into(),
        }
    }
}
