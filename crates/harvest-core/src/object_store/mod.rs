//! Durable destination for collected files, reports and run records.
//!
//! The bucket SDK is abstracted behind [`ObjectStore`]. [`FsObjectStore`]
//! maps keys onto a directory tree (a mounted bucket, or a scratch dir in
//! tests) and replaces objects by rename so readers never observe a
//! partially written object.

mod fs;
pub mod keys;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use fs::FsObjectStore;

/// Metadata of an object already in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    /// Lowercase-hex SHA-256 of the stored bytes, when known.
    #[serde(default)]
    pub sha256: Option<String>,
    /// Remote validator (ETag / Last-Modified) the object was fetched with.
    #[serde(default)]
    pub validator: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    pub updated: DateTime<Utc>,
}

/// Extra metadata supplied with an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMeta {
    pub validator: Option<String>,
    pub content_type: Option<String>,
    /// Precomputed digest; computed by the store when absent.
    pub sha256: Option<String>,
}

/// Minimal object-store surface the scheduler core consumes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Metadata for `key`, or `None` if no object exists.
    async fn stat(&self, key: &str) -> Result<Option<StoredObject>>;

    /// Upload a local file to `key`, replacing any existing object.
    async fn put_file(&self, key: &str, local: &Path, meta: &ObjectMeta) -> Result<StoredObject>;

    /// Write an in-memory object (JSON reports and records).
    async fn put_bytes(&self, key: &str, data: &[u8], content_type: &str) -> Result<()>;

    /// Object content, or `None` if missing.
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace `dst` with a copy of `src`.
    async fn copy(&self, src: &str, dst: &str) -> Result<()>;

    /// Replace the recorded remote validator of an existing object; content is untouched.
    async fn set_validator(&self, key: &str, validator: Option<String>) -> Result<()>;
}

/// First free key among `key`, `key_1`, `key_2`, ... (suffix before the extension).
pub async fn vacant_key(store: &dyn ObjectStore, key: &str) -> Result<String> {
    let mut candidate = key.to_string();
    let mut n = 0;
    while store.stat(&candidate).await?.is_some() {
        n += 1;
        candidate = keys::numbered(key, n);
    }
    Ok(candidate)
}
