//! Error taxonomy shared by the dispatcher, triggers and transfers.
//!
//! Every failure that ends up in a [`RunOutcome`](crate::report::RunOutcome)
//! is reduced to an [`ErrorKind`] so callers can tell retryable conditions
//! (network, timeout) from terminal ones (storage, validation, config).

use serde::{Deserialize, Serialize};
use std::fmt;

pub use crate::retry::TransferError;

/// High-level classification of a job or transfer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Transport or HTTP failure talking to a remote endpoint. Retryable.
    #[serde(rename = "NetworkError")]
    Network,
    /// Destination read/write failure. Not retried by the transfer layer.
    #[serde(rename = "StorageError")]
    Storage,
    /// Content failed a size or structural check. Not retried.
    #[serde(rename = "ValidationError")]
    Validation,
    /// Missing or invalid settings. Fatal at startup.
    #[serde(rename = "ConfigurationError")]
    Configuration,
    /// Per-job or per-attempt deadline exceeded.
    #[serde(rename = "Timeout")]
    Timeout,
    /// The job's task panicked or was torn down unexpectedly.
    #[serde(rename = "InternalError")]
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "NetworkError",
            ErrorKind::Storage => "StorageError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Internal => "InternalError",
        }
    }

    /// Only transport failures and attempt deadlines are worth another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Timeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error attached to a failed job outcome: a kind plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

/// Raised when configuration is missing or inconsistent.
#[derive(Debug, thiserror::Error)]
#[error("configuration error: {0}")]
pub struct ConfigError(pub String);

impl From<ConfigError> for JobError {
    fn from(e: ConfigError) -> Self {
        JobError::new(ErrorKind::Configuration, e.0)
    }
}
