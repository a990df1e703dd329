//! HTTP HEAD / metadata probing.
//!
//! Uses the curl crate (libcurl) to fetch response headers only and capture
//! `Content-Length`, `ETag` and `Last-Modified`: everything needed for a
//! remote fingerprint without transferring the body.

mod parse;

use std::collections::HashMap;
use std::str;
use std::time::Duration;

use crate::retry::TransferError;

pub(crate) use parse::parse_headers;

/// Result of a HEAD request: the headers a fingerprint is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResult {
    /// HTTP status of the final response (after redirects).
    pub status: u32,
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// `ETag` value if present, quotes and weak prefix kept verbatim.
    pub etag: Option<String>,
    /// `Last-Modified` value if present.
    pub last_modified: Option<String>,
}

impl HeadResult {
    /// Strongest validator the server offered: ETag, else Last-Modified.
    pub fn validator(&self) -> Option<String> {
        self.etag.clone().or_else(|| self.last_modified.clone())
    }
}

/// Performs a HEAD request and returns parsed metadata.
///
/// Follows redirects. Runs in the current thread; call from `spawn_blocking`
/// if used from async code. Servers that reject HEAD (405/501) yield a
/// result with no size and no validator rather than an error, so callers
/// fall back to downloading.
pub fn probe(
    url: &str,
    custom_headers: &HashMap<String, String>,
    timeout: Duration,
) -> Result<HeadResult, TransferError> {
    let mut headers: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.nobody(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(Duration::from_secs(15).min(timeout))?;
    easy.timeout(timeout)?;

    let mut list = curl::easy::List::new();
    for (k, v) in custom_headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    if !custom_headers.is_empty() {
        easy.http_headers(list)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                let line = s.trim_end();
                // A new status line starts a new response (redirect hop).
                if line.starts_with("HTTP/") {
                    headers.clear();
                }
                headers.push(line.to_string());
            }
            true
        })?;
        transfer.perform()?;
    }

    let status = easy.response_code()?;
    if status == 405 || status == 501 {
        tracing::debug!(url, status, "HEAD not supported, fingerprint unknown");
        return Ok(HeadResult {
            status,
            ..HeadResult::default()
        });
    }
    if !(200..300).contains(&status) {
        return Err(TransferError::Http {
            status,
            url: url.to_string(),
        });
    }

    let mut head = parse_headers(&headers);
    head.status = status;
    Ok(head)
}
