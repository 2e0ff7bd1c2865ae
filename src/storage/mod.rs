//! Object storage seam.
//!
//! The processor only ever needs three operations on a store: learn an
//! object's size, copy an object into a local file, and write a local file
//! back as an object. [`ObjectStore`] captures exactly those, so the pipeline
//! runs unchanged against S3 in production and a directory tree locally.

use crate::error::StoreError;
use crate::event::StorageObjectRef;
use async_trait::async_trait;
use std::path::Path;

pub mod local;
#[cfg(feature = "aws")]
pub mod s3;

pub use local::LocalObjectStore;
#[cfg(feature = "aws")]
pub use s3::S3ObjectStore;

/// Content type attached to every rendered object.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Operations the pipeline performs against object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Size of the object in bytes.
    ///
    /// Returns [`StoreError::NotFound`] if the object does not exist.
    async fn object_size(&self, object: &StorageObjectRef) -> Result<u64, StoreError>;

    /// Copy the object's bytes into `destination`, creating or truncating it.
    /// The parent directory must already exist. Returns the bytes written.
    ///
    /// At most `limit` bytes ever reach `destination`. A body of `limit`
    /// bytes or more is abandoned with [`StoreError::LimitExceeded`].
    async fn download_to(
        &self,
        object: &StorageObjectRef,
        destination: &Path,
        limit: u64,
    ) -> Result<u64, StoreError>;

    /// Write the contents of `source` as `object`, replacing any previous
    /// version. Readers never observe a partially written object.
    async fn upload_from(
        &self,
        source: &Path,
        object: &StorageObjectRef,
        content_type: &str,
    ) -> Result<(), StoreError>;
}
