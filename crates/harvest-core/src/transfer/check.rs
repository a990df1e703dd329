//! Job-specific content checks run on a downloaded file before upload.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::config::CheckKind;
use crate::retry::TransferError;

/// Structural check of a local file. Failures are never retried.
pub trait ContentCheck: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, path: &Path) -> Result<(), TransferError>;
}

/// File parses as a JSON document (GeoJSON feature collections, API dumps).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCheck;

impl ContentCheck for JsonCheck {
    fn name(&self) -> &'static str {
        "json"
    }

    fn check(&self, path: &Path) -> Result<(), TransferError> {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader::<_, serde::de::IgnoredAny>(reader)
            .map(|_| ())
            .map_err(|e| TransferError::Validation(format!("invalid JSON: {}", e)))
    }
}

/// File has at least one byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmptyCheck;

impl ContentCheck for NonEmptyCheck {
    fn name(&self) -> &'static str {
        "nonempty"
    }

    fn check(&self, path: &Path) -> Result<(), TransferError> {
        if std::fs::metadata(path)?.len() == 0 {
            return Err(TransferError::Validation("empty file".into()));
        }
        Ok(())
    }
}

pub fn check_for(kind: CheckKind) -> Box<dyn ContentCheck> {
    match kind {
        CheckKind::Json => Box::new(JsonCheck),
        CheckKind::Nonempty => Box::new(NonEmptyCheck),
    }
}
