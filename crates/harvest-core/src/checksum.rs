//! Content digests for local files.
//!
//! One streaming pass yields both the byte count and the SHA-256, so the
//! transfer layer can check the declared length and fingerprint the file
//! without reading it twice.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Size and lowercase-hex SHA-256 of a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDigest {
    pub size: u64,
    pub sha256: String,
}

/// Hash a file in chunks to keep memory use bounded; suitable for large archives.
pub fn digest_path(path: &Path) -> Result<LocalDigest> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    let mut size = 0u64;
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        size += n as u64;
        hasher.update(&buf[..n]);
    }
    Ok(LocalDigest {
        size,
        sha256: hex::encode(hasher.finalize()),
    })
}

/// SHA-256 of an in-memory buffer (reports and run records).
pub fn sha256_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
