//! Per-file transfer error, classified before it reaches a job outcome.

use std::time::Duration;

use crate::error::{ErrorKind, JobError};

/// Failure of one probe, download attempt, check or upload.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {status} for {url}")]
    Http { status: u32, url: String },
    /// Body ended before the declared Content-Length.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// Downloaded content failed a structural check.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Destination read/write failed.
    #[error("storage: {0}")]
    Storage(String),
    /// Local scratch file I/O failed.
    #[error("local io: {0}")]
    Io(#[from] std::io::Error),
    /// The attempt exceeded its deadline outside of curl's own timer.
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),
}

impl TransferError {
    pub fn storage(e: anyhow::Error) -> Self {
        TransferError::Storage(format!("{:#}", e))
    }

    /// True for transport failures and attempt deadlines.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Map onto the shared error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::Curl(e) if e.is_operation_timedout() => ErrorKind::Timeout,
            TransferError::Curl(e) if e.is_write_error() => ErrorKind::Storage,
            TransferError::Curl(e) if e.is_url_malformed() || e.is_unsupported_protocol() => {
                ErrorKind::Configuration
            }
            TransferError::Curl(_) | TransferError::Http { .. } => ErrorKind::Network,
            TransferError::PartialTransfer { .. } | TransferError::Validation(_) => {
                ErrorKind::Validation
            }
            TransferError::Storage(_) | TransferError::Io(_) => ErrorKind::Storage,
            TransferError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

impl From<&TransferError> for JobError {
    fn from(e: &TransferError) -> Self {
        JobError::new(e.kind(), e.to_string())
    }
}
