//! Error types for the sensorstream pipeline.

use std::error::Error as StdError;
use std::fmt;
use std::result;

/// A specialized Result type for pipeline operations.
pub type Result<T> = result::Result<T, Error>;

/// The error type for pipeline operations.
///
/// Nothing in this crate is fatal to the process: query and subscription
/// errors surface to the caller, which decides whether to retry or
/// restart the stream, and unparseable rows are dropped where they
/// occur.
#[derive(Debug)]
pub enum Error {
    /// Invalid caller-supplied arguments (bad time window, bad quantile probability)
    InvalidArgument(String),
    /// Network or HTTP failure against the upstream data service
    Transport {
        /// HTTP status code, when the request got far enough to receive one
        status: Option<u16>,
        /// Error body or transport-level message, surfaced for diagnostics
        message: String,
    },
    /// Subscription setup or teardown failure on the change feed
    Subscription(String),
    /// Upstream row that failed timestamp or value sanitization
    DataIntegrity(String),
    /// Configuration errors
    Config(String),
    /// I/O errors
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::Transport { status: Some(code), message } => {
                write!(f, "Transport error (HTTP {}): {}", code, message)
            }
            Error::Transport { status: None, message } => {
                write!(f, "Transport error: {}", message)
            }
            Error::Subscription(msg) => write!(f, "Subscription error: {}", msg),
            Error::DataIntegrity(msg) => write!(f, "Data integrity error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::DataIntegrity(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
