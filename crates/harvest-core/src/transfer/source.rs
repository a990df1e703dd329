//! Where files come from: the [`Source`] seam and its libcurl implementation.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str;
use std::time::Duration;

use super::fingerprint::FileFingerprint;
use crate::fetch_head::{self, parse_headers};
use crate::retry::TransferError;

/// Blocking access to remote files. Implementations are called from
/// `spawn_blocking`, once per attempt.
pub trait Source: Send + Sync {
    /// Metadata-only probe; must not transfer the body.
    fn probe(&self, locator: &str, timeout: Duration) -> Result<FileFingerprint, TransferError>;

    /// Download `locator` into `dest` (truncating it) and return the bytes written.
    ///
    /// `expected_len` is the size the probe reported. A body shorter or longer
    /// than the declared length is a [`TransferError::PartialTransfer`].
    fn fetch(
        &self,
        locator: &str,
        dest: &Path,
        expected_len: Option<u64>,
        timeout: Duration,
    ) -> Result<u64, TransferError>;
}

/// HTTP(S) source over libcurl.
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
    headers: HashMap<String, String>,
}

impl HttpSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra request headers (e.g. an API key some portals require).
    pub fn with_headers(headers: HashMap<String, String>) -> Self {
        Self { headers }
    }
}

impl Source for HttpSource {
    fn probe(&self, locator: &str, timeout: Duration) -> Result<FileFingerprint, TransferError> {
        let head = fetch_head::probe(locator, &self.headers, timeout)?;
        Ok(FileFingerprint::from_head(&head))
    }

    fn fetch(
        &self,
        locator: &str,
        dest: &Path,
        expected_len: Option<u64>,
        timeout: Duration,
    ) -> Result<u64, TransferError> {
        let mut file = File::create(dest)?;
        let mut written = 0u64;
        let mut write_err: Option<std::io::Error> = None;
        let mut header_lines: Vec<String> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(locator)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(Duration::from_secs(30).min(timeout))?;
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(Duration::from_secs(60))?;
        easy.timeout(timeout)?;

        let mut list = curl::easy::List::new();
        for (k, v) in &self.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        if !self.headers.is_empty() {
            easy.http_headers(list)?;
        }

        let performed = {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    let line = s.trim_end();
                    if line.starts_with("HTTP/") {
                        header_lines.clear();
                    }
                    header_lines.push(line.to_string());
                }
                true
            })?;
            transfer.write_function(|data| match file.write_all(data) {
                Ok(()) => {
                    written += data.len() as u64;
                    Ok(data.len())
                }
                Err(e) => {
                    write_err = Some(e);
                    Ok(0) // abort transfer
                }
            })?;
            transfer.perform()
        };

        if let Some(e) = write_err {
            return Err(TransferError::Io(e));
        }
        let declared = parse_headers(&header_lines).content_length.or(expected_len);
        match performed {
            // Connection closed before the declared length arrived.
            Err(e) if e.is_partial_file() => {
                return Err(TransferError::PartialTransfer {
                    expected: declared.unwrap_or(0),
                    received: written,
                });
            }
            r => r?,
        }

        let status = easy.response_code()?;
        if !(200..300).contains(&status) {
            return Err(TransferError::Http {
                status,
                url: locator.to_string(),
            });
        }
        file.flush()?;
        file.sync_all()?;

        if let Some(expected) = declared {
            if written != expected {
                return Err(TransferError::PartialTransfer {
                    expected,
                    received: written,
                });
            }
        }
        Ok(written)
    }
}
