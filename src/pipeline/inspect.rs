//! Size check, run before any download.

use crate::error::{Md2HtmlError, StoreError};
use crate::event::StorageObjectRef;
use crate::storage::ObjectStore;
use tracing::debug;

/// Look up the size of `object` and reject it if it is `max` bytes or more.
///
/// A missing object maps to [`Md2HtmlError::SourceNotFound`]; any other
/// lookup failure maps to [`Md2HtmlError::SizeUnknown`] so that an object of
/// unknown size is never downloaded.
pub async fn check_size(
    store: &dyn ObjectStore,
    object: &StorageObjectRef,
    max: u64,
) -> Result<u64, Md2HtmlError> {
    let size = store.object_size(object).await.map_err(|e| match e {
        StoreError::NotFound => Md2HtmlError::SourceNotFound { uri: object.uri() },
        other => Md2HtmlError::SizeUnknown {
            uri: object.uri(),
            detail: other.to_string(),
        },
    })?;

    debug!("{} is {} bytes (limit {})", object, size, max);
    if size >= max {
        return Err(Md2HtmlError::ObjectTooLarge {
            uri: object.uri(),
            size,
            max,
        });
    }
    Ok(size)
}
