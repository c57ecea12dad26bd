//! Error types for framing and configuration

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while reassembling length-prefixed messages
#[derive(Debug, Error)]
pub enum FrameError {
    /// The source closed before the current message was complete
    #[error("stream closed mid-message: expected {expected} bytes, received {received}")]
    Truncated { expected: usize, received: usize },

    /// Appending the next chunk would exceed the message buffer capacity
    #[error("message too long: {attempted} bytes exceeds capacity of {capacity}")]
    MessageTooLong { capacity: usize, attempted: usize },

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
