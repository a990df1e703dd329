//! Remote vs stored fingerprint comparison.

use std::fmt;

use crate::fetch_head::HeadResult;
use crate::object_store::StoredObject;

/// Size plus a strong validator (remote ETag / Last-Modified, or content hash).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFingerprint {
    pub size: Option<u64>,
    pub validator: Option<String>,
}

impl FileFingerprint {
    pub fn new(size: u64, validator: Option<String>) -> Self {
        Self {
            size: Some(size),
            validator,
        }
    }

    pub fn from_head(head: &HeadResult) -> Self {
        Self {
            size: head.content_length,
            validator: head.validator(),
        }
    }

    pub fn from_stored(obj: &StoredObject) -> Self {
        Self {
            size: Some(obj.size),
            validator: obj.validator.clone(),
        }
    }
}

/// Why a stored object does or does not satisfy the remote fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// Sizes agree and validators agree (or one side has none).
    Match,
    /// Remote did not report a size; re-fetch to be safe.
    UnknownRemoteSize,
    SizeMismatch { remote: u64, stored: u64 },
    ValidatorMismatch { remote: String, stored: String },
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        matches!(self, Comparison::Match)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Match => write!(f, "stored object matches remote"),
            Comparison::UnknownRemoteSize => write!(f, "remote size unknown"),
            Comparison::SizeMismatch { remote, stored } => {
                write!(f, "size mismatch: remote={}, stored={}", remote, stored)
            }
            Comparison::ValidatorMismatch { remote, stored } => {
                write!(f, "validator mismatch: remote={}, stored={}", remote, stored)
            }
        }
    }
}

/// Compare size first (cheap, short-circuits), then the validator.
pub fn compare(remote: &FileFingerprint, stored: &FileFingerprint) -> Comparison {
    let Some(remote_size) = remote.size else {
        return Comparison::UnknownRemoteSize;
    };
    if let Some(stored_size) = stored.size {
        if stored_size != remote_size {
            return Comparison::SizeMismatch {
                remote: remote_size,
                stored: stored_size,
            };
        }
    }
    match (&remote.validator, &stored.validator) {
        (Some(r), Some(s)) if r != s => Comparison::ValidatorMismatch {
            remote: r.clone(),
            stored: s.clone(),
        },
        _ => Comparison::Match,
    }
}
