//! Amazon S3 adapter.

use super::ObjectStore;
use crate::error::StoreError;
use crate::event::StorageObjectRef;
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// An [`ObjectStore`] backed by Amazon S3.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn object_size(&self, object: &StorageObjectRef) -> Result<u64, StoreError> {
        let output = self
            .client
            .head_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    StoreError::NotFound
                } else {
                    StoreError::Backend(DisplayErrorContext(&err).to_string())
                }
            })?;

        let length = output
            .content_length()
            .ok_or_else(|| StoreError::Backend("HeadObject returned no content length".into()))?;
        u64::try_from(length)
            .map_err(|_| StoreError::Backend(format!("HeadObject returned content length {length}")))
    }

    async fn download_to(
        &self,
        object: &StorageObjectRef,
        destination: &Path,
        limit: u64,
    ) -> Result<u64, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    StoreError::NotFound
                } else {
                    StoreError::Backend(DisplayErrorContext(&err).to_string())
                }
            })?;

        // Stream the body to disk chunk by chunk; objects can be up to the
        // configured size limit and need not fit in memory twice.
        let mut body = output.body;
        let mut file = tokio::fs::File::create(destination).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| StoreError::Backend(DisplayErrorContext(&e).to_string()))?
        {
            let received = written + chunk.len() as u64;
            if received >= limit {
                // Dropping `body` closes the connection mid-transfer.
                return Err(StoreError::LimitExceeded { received });
            }
            file.write_all(&chunk).await?;
            written = received;
        }
        file.flush().await?;

        debug!("GetObject {} → {} bytes", object, written);
        Ok(written)
    }

    async fn upload_from(
        &self,
        source: &Path,
        object: &StorageObjectRef,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StoreError::Backend(DisplayErrorContext(&e).to_string()))?;

        self.client
            .put_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|err| StoreError::Backend(DisplayErrorContext(&err).to_string()))?;

        debug!("PutObject {}", object);
        Ok(())
    }
}
