//! Retry and backoff policy.
//!
//! This module encapsulates error classification (timeouts, throttling,
//! connection failures) and exponential backoff decisions so that every
//! transfer shares one policy. Only transport failures and attempt
//! deadlines are retried; validation and storage failures stop at once.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::TransferError;
pub use policy::{RetryClass, RetryDecision, RetryPolicy};
pub use run::{run_with_retry, TransferAttempt};
