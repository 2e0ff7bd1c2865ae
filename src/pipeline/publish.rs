//! Write rendered HTML locally and upload it to the target bucket.

use super::workspace::WorkingDirectory;
use crate::error::Md2HtmlError;
use crate::event::StorageObjectRef;
use crate::storage::{ObjectStore, HTML_CONTENT_TYPE};
use std::path::{Path, PathBuf};
use tracing::info;

/// The destination key: `source_key` with its extension replaced by `.html`.
///
/// Only the final path segment is considered, and leading dots do not start
/// an extension, so `.hidden` becomes `.hidden.html`.
///
/// ```
/// use edgequake_md2html::pipeline::publish::destination_key;
/// assert_eq!(destination_key("notes/readme.md"), "notes/readme.html");
/// assert_eq!(destination_key("v1.2/README"), "v1.2/README.html");
/// ```
pub fn destination_key(source_key: &str) -> String {
    let name_start = source_key.rfind('/').map_or(0, |i| i + 1);
    let name = &source_key[name_start..];
    let stem_len = match name.rfind('.') {
        Some(dot) if name[..dot].chars().any(|c| c != '.') => dot,
        _ => name.len(),
    };
    format!("{}.html", &source_key[..name_start + stem_len])
}

/// Write `html` to `{workspace}/{html_key}`.
pub async fn write_html(
    workspace: &WorkingDirectory,
    html_key: &str,
    html: &str,
) -> Result<PathBuf, Md2HtmlError> {
    let path = workspace.local_path(html_key)?;
    let failed = |e: std::io::Error| Md2HtmlError::OutputWriteFailed {
        path: path.display().to_string(),
        detail: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }
    tokio::fs::write(&path, html).await.map_err(failed)?;
    Ok(path)
}

/// Upload the local file at `local` as `destination`.
pub async fn upload(
    store: &dyn ObjectStore,
    local: &Path,
    destination: &StorageObjectRef,
) -> Result<(), Md2HtmlError> {
    store
        .upload_from(local, destination, HTML_CONTENT_TYPE)
        .await
        .map_err(|e| Md2HtmlError::UploadFailed {
            path: local.display().to_string(),
            uri: destination.uri(),
            detail: e.to_string(),
        })?;
    info!("Uploaded {}", destination);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalObjectStore;
    use tempfile::TempDir;

    #[test]
    fn replaces_extension() {
        assert_eq!(destination_key("notes/readme.md"), "notes/readme.html");
        assert_eq!(destination_key("a.tar.md"), "a.tar.html");
        assert_eq!(destination_key("README"), "README.html");
        assert_eq!(destination_key("docs/.hidden"), "docs/.hidden.html");
        assert_eq!(destination_key("docs/..x.md"), "docs/..x.html");
        assert_eq!(destination_key("trailing."), "trailing.html");
        assert_eq!(destination_key("dir.d/file"), "dir.d/file.html");
    }

    #[tokio::test]
    async fn write_then_upload() {
        let root = TempDir::new().unwrap();
        let store = LocalObjectStore::new(root.path().join("store"));
        let ws = WorkingDirectory::create(Some(root.path().join("scratch").as_path())).unwrap();

        let local = write_html(&ws, "notes/readme.html", "<h1>Hi</h1>\n")
            .await
            .unwrap();
        assert_eq!(local, ws.path().join("notes/readme.html"));

        let dest = StorageObjectRef::new("target", "notes/readme.html");
        upload(&store, &local, &dest).await.unwrap();
        assert_eq!(store.get_bytes(&dest).await.unwrap(), b"<h1>Hi</h1>\n");
        assert!(ws.cleanup().is_empty());
    }

    #[tokio::test]
    async fn upload_of_missing_file_fails() {
        let root = TempDir::new().unwrap();
        let store = LocalObjectStore::new(root.path());
        let dest = StorageObjectRef::new("target", "a.html");
        let err = upload(&store, &root.path().join("nope.html"), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, Md2HtmlError::UploadFailed { .. }));
        assert!(!store.contains(&dest).await);
    }
}
