//! Per-record scratch directory.
//!
//! ## Why not just drop a `TempDir`?
//!
//! `TempDir`'s destructor removes the tree silently and ignores errors. The
//! worker needs to know which scratch files it failed to delete, so
//! [`WorkingDirectory::cleanup`] removes entries one by one, logs and
//! collects every failure, and only then removes the directory. The
//! `TempDir` is still held underneath so an unwinding panic leaves no
//! litter behind.

use crate::error::Md2HtmlError;
use crate::event::key_to_relative_path;
use crate::output::CleanupIssue;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, error};
use walkdir::WalkDir;

/// A fresh, empty directory owned by one record.
#[derive(Debug)]
pub struct WorkingDirectory {
    dir: TempDir,
}

impl WorkingDirectory {
    /// Create a new directory under `root`, or under the system temp
    /// directory when `root` is None.
    pub fn create(root: Option<&Path>) -> Result<Self, Md2HtmlError> {
        let unavailable = |e: std::io::Error| Md2HtmlError::WorkspaceUnavailable {
            detail: e.to_string(),
        };

        let mut builder = tempfile::Builder::new();
        builder.prefix("md2html-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(unavailable)?;
                builder.tempdir_in(root).map_err(unavailable)?
            }
            None => builder.tempdir().map_err(unavailable)?,
        };

        debug!("Created working directory: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Local path for an object key inside this directory.
    pub fn local_path(&self, key: &str) -> Result<PathBuf, Md2HtmlError> {
        key_to_relative_path(key)
            .map(|rel| self.dir.path().join(rel))
            .ok_or_else(|| {
                Md2HtmlError::malformed(format!("object key {key:?} is not a safe relative path"))
            })
    }

    /// Remove every file, then every sub-directory, then the directory itself.
    ///
    /// Never fails: each removal error is logged and returned as a
    /// [`CleanupIssue`].
    pub fn cleanup(self) -> Vec<CleanupIssue> {
        let root = self.dir.path().to_path_buf();
        let mut issues = Vec::new();

        // contents_first: children are yielded before their parent directory
        for entry in WalkDir::new(&root).min_depth(1).contents_first(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    error!("Could not walk {}: {}", path.display(), e);
                    issues.push(CleanupIssue {
                        path,
                        detail: e.to_string(),
                    });
                    continue;
                }
            };

            let path = entry.path();
            let result = if entry.file_type().is_dir() {
                debug!("Removing directory: {}", path.display());
                std::fs::remove_dir(path)
            } else {
                debug!("Removing file: {}", path.display());
                std::fs::remove_file(path)
            };

            if let Err(e) = result {
                error!("Could not delete {}: {}", path.display(), e);
                issues.push(CleanupIssue {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                });
            }
        }

        debug!("Removing folder: {}", root.display());
        if let Err(e) = self.dir.close() {
            error!("Could not delete folder {}: {}", root.display(), e);
            issues.push(CleanupIssue {
                path: root,
                detail: e.to_string(),
            });
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_under_root_and_cleanup() {
        let root = TempDir::new().unwrap();
        let ws = WorkingDirectory::create(Some(root.path())).unwrap();
        let path = ws.path().to_path_buf();
        assert!(path.starts_with(root.path()));
        assert!(path.is_dir());

        let nested = ws.local_path("notes/deep/readme.md").unwrap();
        std::fs::create_dir_all(nested.parent().unwrap()).unwrap();
        std::fs::write(&nested, "# Hi").unwrap();
        std::fs::write(ws.local_path("top.html").unwrap(), "<p/>").unwrap();

        let issues = ws.cleanup();
        assert!(issues.is_empty(), "{issues:?}");
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn creates_missing_root() {
        let parent = TempDir::new().unwrap();
        let root = parent.path().join("scratch/md2html");
        let ws = WorkingDirectory::create(Some(root.as_path())).unwrap();
        assert!(root.is_dir());
        assert!(ws.cleanup().is_empty());
    }

    #[test]
    fn each_directory_is_fresh() {
        let a = WorkingDirectory::create(None).unwrap();
        let b = WorkingDirectory::create(None).unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(std::fs::read_dir(a.path()).unwrap().count(), 0);
        a.cleanup();
        b.cleanup();
    }

    #[test]
    fn local_path_rejects_traversal() {
        let ws = WorkingDirectory::create(None).unwrap();
        assert!(matches!(
            ws.local_path("../escape.md"),
            Err(Md2HtmlError::MalformedMessage { .. })
        ));
        ws.cleanup();
    }
}
