//! Directory-backed object store.
//!
//! Layout: `{root}/{bucket}/{key}`. Used by the `replay` command and by the
//! integration tests; it honours the same contract as the S3 adapter,
//! including all-or-nothing writes (temp file + rename).

use super::ObjectStore;
use crate::error::StoreError;
use crate::event::{key_to_relative_path, StorageObjectRef};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

/// An [`ObjectStore`] rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Filesystem location of `object`. Fails for bucket names or keys that
    /// would resolve outside the root.
    pub fn object_path(&self, object: &StorageObjectRef) -> Result<PathBuf, StoreError> {
        let bucket = object.bucket.as_str();
        if bucket.is_empty() || bucket == "." || bucket == ".." || bucket.contains(['/', '\\']) {
            return Err(StoreError::Backend(format!("invalid bucket name {bucket:?}")));
        }
        let key = key_to_relative_path(&object.key)
            .ok_or_else(|| StoreError::Backend(format!("invalid object key {:?}", object.key)))?;
        Ok(self.root.join(bucket).join(key))
    }

    /// Store `bytes` as `object`.
    pub async fn put_bytes(
        &self,
        object: &StorageObjectRef,
        bytes: impl AsRef<[u8]>,
    ) -> Result<(), StoreError> {
        let path = self.object_path(object)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = staging_path(&path);
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Read the full contents of `object`.
    pub async fn get_bytes(&self, object: &StorageObjectRef) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(object)?;
        tokio::fs::read(&path).await.map_err(not_found_or_io)
    }

    /// Whether `object` exists.
    pub async fn contains(&self, object: &StorageObjectRef) -> bool {
        match self.object_path(object) {
            Ok(path) => tokio::fs::metadata(path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn object_size(&self, object: &StorageObjectRef) -> Result<u64, StoreError> {
        let path = self.object_path(object)?;
        let meta = tokio::fs::metadata(&path).await.map_err(not_found_or_io)?;
        if !meta.is_file() {
            return Err(StoreError::NotFound);
        }
        Ok(meta.len())
    }

    async fn download_to(
        &self,
        object: &StorageObjectRef,
        destination: &Path,
        limit: u64,
    ) -> Result<u64, StoreError> {
        let path = self.object_path(object)?;
        let source = tokio::fs::File::open(&path).await.map_err(not_found_or_io)?;
        let mut file = tokio::fs::File::create(destination).await?;

        // Copy at most `limit` bytes; reaching the limit means the object is too big.
        let bytes = tokio::io::copy(&mut source.take(limit), &mut file).await?;
        file.flush().await?;
        if bytes >= limit {
            return Err(StoreError::LimitExceeded { received: bytes });
        }
        debug!("Copied {} → {} ({} bytes)", path.display(), destination.display(), bytes);
        Ok(bytes)
    }

    async fn upload_from(
        &self,
        source: &Path,
        object: &StorageObjectRef,
        _content_type: &str,
    ) -> Result<(), StoreError> {
        let path = self.object_path(object)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Atomic write: copy to a sibling temp file, then rename over the target.
        let tmp = staging_path(&path);
        tokio::fs::copy(source, &tmp).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("Stored {} at {}", object, path.display());
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

fn not_found_or_io(e: std::io::Error) -> StoreError {
    if e.kind() == ErrorKind::NotFound {
        StoreError::NotFound
    } else {
        StoreError::Io(e)
    }
}
