//! Directory-backed object store with rename-into-place writes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use super::{ObjectMeta, ObjectStore, StoredObject};
use crate::checksum;

/// Suffix of the sidecar holding an object's metadata.
const META_SUFFIX: &str = ".meta.json";

/// Object store rooted at a local directory. Keys map to relative paths.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path under the root, rejecting absolute keys and `..`.
    fn object_path(&self, key: &str) -> Result<PathBuf> {
        let rel = Path::new(key);
        let clean = !key.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            anyhow::bail!("invalid object key: {:?}", key);
        }
        Ok(self.root.join(rel))
    }

    fn meta_path(path: &Path) -> PathBuf {
        let mut o = path.as_os_str().to_owned();
        o.push(META_SUFFIX);
        PathBuf::from(o)
    }
}

/// Write `data` to a temp file next to `path`, fsync, then rename over `path`.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("no parent dir for {}", path.display()))?;
    std::fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("temp file in {}", parent.display()))?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .with_context(|| format!("rename into {}", path.display()))?;
    Ok(())
}

/// Stream `src` into a temp file next to `dst`, fsync, then rename over `dst`.
fn copy_atomic(src: &Path, dst: &Path) -> Result<u64> {
    let parent = dst
        .parent()
        .with_context(|| format!("no parent dir for {}", dst.display()))?;
    std::fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    let mut input = File::open(src).with_context(|| format!("open {}", src.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("temp file in {}", parent.display()))?;
    let n = io::copy(&mut input, tmp.as_file_mut())
        .with_context(|| format!("copy {} to {}", src.display(), dst.display()))?;
    tmp.as_file().sync_all()?;
    tmp.persist(dst)
        .with_context(|| format!("rename into {}", dst.display()))?;
    Ok(n)
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(b) => Ok(Some(b)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
    }
}

fn stat_blocking(key: &str, path: &Path) -> Result<Option<StoredObject>> {
    let md = match std::fs::metadata(path) {
        Ok(md) => md,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("stat {}", path.display())),
    };
    let sidecar = read_optional(&FsObjectStore::meta_path(path))?
        .and_then(|b| serde_json::from_slice::<StoredObject>(&b).ok());
    let obj = match sidecar {
        // A sidecar that disagrees with the file on size is stale; only trust the file.
        Some(meta) if meta.size == md.len() => StoredObject {
            key: key.to_string(),
            ..meta
        },
        _ => StoredObject {
            key: key.to_string(),
            size: md.len(),
            sha256: None,
            validator: None,
            content_type: None,
            updated: md
                .modified()
                .map(chrono::DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now()),
        },
    };
    Ok(Some(obj))
}

fn write_sidecar(path: &Path, obj: &StoredObject) -> Result<()> {
    let json = serde_json::to_vec_pretty(obj).context("serialize object metadata")?;
    write_atomic(&FsObjectStore::meta_path(path), &json)
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow::anyhow!("object store task join: {}", e))?
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn stat(&self, key: &str) -> Result<Option<StoredObject>> {
        let path = self.object_path(key)?;
        let key = key.to_string();
        blocking(move || stat_blocking(&key, &path)).await
    }

    async fn put_file(&self, key: &str, local: &Path, meta: &ObjectMeta) -> Result<StoredObject> {
        let path = self.object_path(key)?;
        let local = local.to_path_buf();
        let key = key.to_string();
        let meta = meta.clone();
        blocking(move || {
            let sha256 = match meta.sha256 {
                Some(d) => d,
                None => checksum::digest_path(&local)?.sha256,
            };
            let size = copy_atomic(&local, &path)?;
            let obj = StoredObject {
                key,
                size,
                sha256: Some(sha256),
                validator: meta.validator,
                content_type: meta.content_type,
                updated: Utc::now(),
            };
            write_sidecar(&path, &obj)?;
            tracing::debug!(key = %obj.key, size = obj.size, "object stored");
            Ok(obj)
        })
        .await
    }

    async fn put_bytes(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        let path = self.object_path(key)?;
        let obj = StoredObject {
            key: key.to_string(),
            size: data.len() as u64,
            sha256: Some(checksum::sha256_bytes(data)),
            validator: None,
            content_type: Some(content_type.to_string()),
            updated: Utc::now(),
        };
        let data = data.to_vec();
        blocking(move || {
            write_atomic(&path, &data)?;
            write_sidecar(&path, &obj)
        })
        .await
    }

    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(key)?;
        blocking(move || read_optional(&path)).await
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let src_path = self.object_path(src)?;
        let dst_path = self.object_path(dst)?;
        let src_key = src.to_string();
        let dst_key = dst.to_string();
        blocking(move || {
            let Some(src_obj) = stat_blocking(&src_key, &src_path)? else {
                anyhow::bail!("copy source missing: {}", src_key);
            };
            copy_atomic(&src_path, &dst_path)?;
            let obj = StoredObject {
                key: dst_key,
                updated: Utc::now(),
                ..src_obj
            };
            write_sidecar(&dst_path, &obj)
        })
        .await
    }

    async fn set_validator(&self, key: &str, validator: Option<String>) -> Result<()> {
        let path = self.object_path(key)?;
        let key = key.to_string();
        blocking(move || {
            let Some(obj) = stat_blocking(&key, &path)? else {
                anyhow::bail!("no object at {}", key);
            };
            write_sidecar(&path, &StoredObject { validator, ..obj })
        })
        .await
    }
}
