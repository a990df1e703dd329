//! Retry loop: run a closure until success or policy says stop.

use std::time::{Duration, Instant};

use super::classify;
use super::error::TransferError;
use super::policy::{RetryDecision, RetryPolicy};

/// Ephemeral state of one attempt, handed to the attempt closure.
#[derive(Debug, Clone)]
pub struct TransferAttempt {
    /// 1-based attempt number.
    pub number: u32,
    /// Time since the first attempt started.
    pub elapsed: Duration,
    /// Display form of the previous attempt's error, if any.
    pub last_error: Option<String>,
}

/// Runs a closure until it succeeds or the retry policy says to stop.
/// On retryable failure, sleeps for the backoff duration then tries again.
///
/// Blocking: call from `spawn_blocking` when used from async code.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, mut f: F) -> Result<T, TransferError>
where
    F: FnMut(&TransferAttempt) -> Result<T, TransferError>,
{
    let started = Instant::now();
    let mut attempt = TransferAttempt {
        number: 1,
        elapsed: Duration::ZERO,
        last_error: None,
    };
    loop {
        match f(&attempt) {
            Ok(v) => return Ok(v),
            Err(e) => {
                let class = classify::classify(&e);
                match policy.decide(attempt.number, class) {
                    RetryDecision::NoRetry => {
                        tracing::debug!(attempt = attempt.number, error = %e, "giving up");
                        return Err(e);
                    }
                    RetryDecision::RetryAfter(d) => {
                        tracing::warn!(
                            attempt = attempt.number,
                            delay_ms = d.as_millis() as u64,
                            error = %e,
                            "attempt failed, retrying"
                        );
                        std::thread::sleep(d);
                        attempt.number += 1;
                        attempt.elapsed = started.elapsed();
                        attempt.last_error = Some(e.to_string());
                    }
                }
            }
        }
    }
}
