//! Classify HTTP status and curl errors into retry classes.

use super::error::TransferError;
use super::policy::RetryClass;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> RetryClass {
    match code {
        429 | 503 => RetryClass::Throttled,
        408 => RetryClass::Timeout,
        500..=599 => RetryClass::Http5xx(code as u16),
        _ => RetryClass::Fatal,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> RetryClass {
    if e.is_operation_timedout() {
        return RetryClass::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_ssl_connect_error()
    {
        return RetryClass::Connection;
    }
    RetryClass::Fatal
}

/// Classify a transfer error. Only transport-level failures are retryable.
pub fn classify(e: &TransferError) -> RetryClass {
    match e {
        TransferError::Curl(ce) => classify_curl_error(ce),
        TransferError::Http { status, .. } => classify_http_status(*status),
        TransferError::Timeout(_) => RetryClass::Timeout,
        TransferError::PartialTransfer { .. }
        | TransferError::Validation(_)
        | TransferError::Storage(_)
        | TransferError::Io(_) => RetryClass::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_429_and_503_throttled() {
        assert_eq!(classify_http_status(429), RetryClass::Throttled);
        assert_eq!(classify_http_status(503), RetryClass::Throttled);
    }

    #[test]
    fn http_5xx_retryable() {
        assert!(matches!(classify_http_status(500), RetryClass::Http5xx(500)));
        assert!(matches!(classify_http_status(502), RetryClass::Http5xx(502)));
    }

    #[test]
    fn http_4xx_fatal() {
        assert_eq!(classify_http_status(404), RetryClass::Fatal);
        assert_eq!(classify_http_status(403), RetryClass::Fatal);
    }

    #[test]
    fn short_body_is_not_retried() {
        let e = TransferError::PartialTransfer {
            expected: 100,
            received: 50,
        };
        assert_eq!(classify(&e), RetryClass::Fatal);
        assert_eq!(
            classify(&TransferError::Curl(curl::Error::new(7))),
            RetryClass::Connection
        );
    }
}
