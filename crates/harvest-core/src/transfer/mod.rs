//! Idempotent, retry-backed file transfer into the object store.
//!
//! One call moves one remote file to one destination key:
//!
//! 1. probe the remote fingerprint (no body),
//! 2. skip when the stored object already matches,
//! 3. download to a scratch file with bounded retry,
//! 4. run the job's content check,
//! 5. upload, unless the downloaded bytes equal the stored object,
//! 6. drop the scratch file on every path.

mod check;
mod fingerprint;
mod source;

pub use check::{check_for, ContentCheck, JsonCheck, NonEmptyCheck};
pub use fingerprint::{compare, Comparison, FileFingerprint};
pub use source::{HttpSource, Source};

use std::path::PathBuf;
use std::sync::Arc;

use crate::checksum::{self, LocalDigest};
use crate::config::{RetryConfig, TransferConfig};
use crate::object_store::{ObjectMeta, ObjectStore};
use crate::retry::{run_with_retry, RetryPolicy, TransferError};

/// Result of one [`IdempotentTransfer::fetch_if_needed`] call.
#[derive(Debug)]
pub enum TransferOutcome {
    /// A fresh copy was downloaded and written to the destination.
    Uploaded { key: String, size: u64 },
    /// The stored object already matches the remote fingerprint or the downloaded bytes.
    Skipped { key: String, size: u64 },
    Failed { key: String, error: TransferError },
}

impl TransferOutcome {
    pub fn key(&self) -> &str {
        match self {
            TransferOutcome::Uploaded { key, .. }
            | TransferOutcome::Skipped { key, .. }
            | TransferOutcome::Failed { key, .. } => key,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TransferOutcome::Failed { .. })
    }
}

/// Shared transfer machinery; one instance serves every file of a job.
#[derive(Clone)]
pub struct IdempotentTransfer {
    source: Arc<dyn Source>,
    store: Arc<dyn ObjectStore>,
    policy: RetryPolicy,
    work_dir: PathBuf,
    compare_existing: bool,
}

impl IdempotentTransfer {
    pub fn new(source: Arc<dyn Source>, store: Arc<dyn ObjectStore>, policy: RetryPolicy) -> Self {
        Self {
            source,
            store,
            policy,
            work_dir: std::env::temp_dir(),
            compare_existing: true,
        }
    }

    pub fn from_config(
        source: Arc<dyn Source>,
        store: Arc<dyn ObjectStore>,
        retry: &RetryConfig,
        transfer: &TransferConfig,
    ) -> Self {
        let mut t = Self::new(source, store, RetryPolicy::from(retry));
        if let Some(dir) = &transfer.work_dir {
            t.work_dir = dir.clone();
        }
        t.compare_existing = transfer.compare_existing;
        t
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// When false, stored fingerprints are ignored and every file is re-fetched.
    pub fn compare_existing(mut self, yes: bool) -> Self {
        self.compare_existing = yes;
        self
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Fetch `source_url` into `dest_key` unless the stored copy already matches.
    pub async fn fetch_if_needed(
        &self,
        source_url: &str,
        dest_key: &str,
        check: Option<Arc<dyn ContentCheck>>,
    ) -> TransferOutcome {
        match self.transfer(source_url, dest_key, check).await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!(key = dest_key, url = source_url, error = %error, "transfer failed");
                TransferOutcome::Failed {
                    key: dest_key.to_string(),
                    error,
                }
            }
        }
    }

    async fn transfer(
        &self,
        source_url: &str,
        dest_key: &str,
        check: Option<Arc<dyn ContentCheck>>,
    ) -> Result<TransferOutcome, TransferError> {
        let remote = self.probe(source_url).await?;

        if self.compare_existing {
            match self.store.stat(dest_key).await {
                Ok(Some(stored)) => {
                    let cmp = compare(&remote, &FileFingerprint::from_stored(&stored));
                    if cmp.is_match() {
                        tracing::info!(key = dest_key, size = stored.size, "unchanged, skipping");
                        return Ok(TransferOutcome::Skipped {
                            key: dest_key.to_string(),
                            size: stored.size,
                        });
                    }
                    tracing::info!(key = dest_key, reason = %cmp, "remote changed, re-fetching");
                }
                Ok(None) => {}
                Err(e) => {
                    // Cannot compare; fetching again is the safe side.
                    tracing::warn!(key = dest_key, error = %format!("{:#}", e), "stat failed");
                }
            }
        }

        std::fs::create_dir_all(&self.work_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix("harvest-")
            .suffix(".part")
            .tempfile_in(&self.work_dir)?;

        let source = Arc::clone(&self.source);
        let policy = self.policy;
        let url = source_url.to_string();
        let expected = remote.size;
        let (scratch, written) = tokio::task::spawn_blocking(move || {
            let written = run_with_retry(&policy, |attempt| {
                tracing::debug!(url = %url, attempt = attempt.number, "downloading");
                source.fetch(&url, scratch.path(), expected, policy.attempt_timeout)
            });
            (scratch, written)
        })
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(e.to_string())))?;
        let written = written?;

        let path = scratch.path().to_path_buf();
        let digest = tokio::task::spawn_blocking(move || {
            if let Some(check) = check {
                check.check(&path)?;
            }
            checksum::digest_path(&path)
                .map_err(|e| TransferError::Io(std::io::Error::other(format!("{:#}", e))))
        })
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(e.to_string())))??;

        if digest.size != written {
            return Err(TransferError::PartialTransfer {
                expected: written,
                received: digest.size,
            });
        }

        if self.compare_existing {
            if let Some(skipped) = self.identical_to_stored(dest_key, &digest, &remote).await {
                return Ok(skipped);
            }
        }

        let meta = ObjectMeta {
            validator: remote.validator.clone(),
            content_type: None,
            sha256: Some(digest.sha256),
        };
        let stored = self
            .store
            .put_file(dest_key, scratch.path(), &meta)
            .await
            .map_err(TransferError::storage)?;
        drop(scratch);

        tracing::info!(key = dest_key, size = stored.size, "uploaded");
        Ok(TransferOutcome::Uploaded {
            key: dest_key.to_string(),
            size: stored.size,
        })
    }

    /// `Skipped` when the stored object has the downloaded size and digest.
    /// A changed remote validator is recorded on the stored object.
    async fn identical_to_stored(
        &self,
        key: &str,
        digest: &LocalDigest,
        remote: &FileFingerprint,
    ) -> Option<TransferOutcome> {
        let stored = match self.store.stat(key).await {
            Ok(Some(stored)) => stored,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %format!("{:#}", e), "stat failed");
                return None;
            }
        };
        if stored.size != digest.size || stored.sha256.as_deref() != Some(digest.sha256.as_str()) {
            return None;
        }
        if remote.validator.is_some() && remote.validator != stored.validator {
            if let Err(e) = self.store.set_validator(key, remote.validator.clone()).await {
                tracing::warn!(key, error = %format!("{:#}", e), "validator refresh failed");
            }
        }
        tracing::info!(key, size = stored.size, "downloaded content identical, skipping upload");
        Some(TransferOutcome::Skipped {
            key: key.to_string(),
            size: stored.size,
        })
    }

    async fn probe(&self, url: &str) -> Result<FileFingerprint, TransferError> {
        let source = Arc::clone(&self.source);
        let policy = self.policy;
        let url = url.to_string();
        tokio::task::spawn_blocking(move || {
            run_with_retry(&policy, |_| source.probe(&url, policy.attempt_timeout))
        })
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(e.to_string())))?
    }
}
