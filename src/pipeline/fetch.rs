//! Download a source object into the record's working directory.

use super::workspace::WorkingDirectory;
use crate::error::{Md2HtmlError, StoreError};
use crate::event::StorageObjectRef;
use crate::storage::ObjectStore;
use std::path::PathBuf;
use tracing::info;

/// Download `object` to `{workspace}/{key}`, creating intermediate folders.
///
/// Returns the local path and the number of bytes written. The object can be
/// replaced between the size check and the download, so the transfer itself
/// is capped at `max` bytes and fails with [`Md2HtmlError::ObjectTooLarge`].
pub async fn download(
    store: &dyn ObjectStore,
    object: &StorageObjectRef,
    workspace: &WorkingDirectory,
    max: u64,
) -> Result<(PathBuf, u64), Md2HtmlError> {
    let local = workspace.local_path(&object.key)?;
    let failed = |detail: String| Md2HtmlError::DownloadFailed {
        uri: object.uri(),
        detail,
    };

    if let Some(parent) = local.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| failed(format!("could not create {}: {e}", parent.display())))?;
    }

    let bytes = store
        .download_to(object, &local, max)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => Md2HtmlError::SourceNotFound { uri: object.uri() },
            StoreError::LimitExceeded { received } => Md2HtmlError::ObjectTooLarge {
                uri: object.uri(),
                size: received,
                max,
            },
            other => failed(other.to_string()),
        })?;

    info!("Downloaded {} ({} bytes)", object, bytes);
    Ok((local, bytes))
}
