//! Error types for the edgequake-md2html worker.
//!
//! Three error types reflect three layers of the worker:
//!
//! * [`Md2HtmlError`] (**record-level**): one queue record could not be
//!   converted (bad body, object too large, upload rejected, …). It is stored
//!   inside [`crate::output::RecordReport`] rather than propagated, so one bad
//!   record never stops the rest of the batch.
//!
//! * [`StoreError`]: returned by [`crate::storage::ObjectStore`] adapters.
//!   The pipeline stages translate it into the matching record-level variant.
//!
//! * [`QueueError`]: returned by [`crate::queue::MessageQueue`] adapters.
//!
//! Cleanup failures are not errors at all: they are reported as
//! [`crate::output::CleanupIssue`] and never change a record's outcome.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A fatal error for a single queue record.
///
/// Details are carried as strings so the error can be cloned into reports
/// and serialised alongside them.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Md2HtmlError {
    // ── Message errors ────────────────────────────────────────────────────
    /// The message body does not describe a storage object we understand.
    #[error("Malformed message: {reason}")]
    MalformedMessage { reason: String },

    // ── Source errors ─────────────────────────────────────────────────────
    /// The size of the source object could not be determined.
    #[error("Could not determine size of '{uri}': {detail}")]
    SizeUnknown { uri: String, detail: String },

    /// The source object is at or above the configured size limit.
    #[error("Source object '{uri}' is {size} bytes, limit is {max} bytes")]
    ObjectTooLarge { uri: String, size: u64, max: u64 },

    /// The source object does not exist (download error, not-found case).
    #[error("Source object '{uri}' does not exist")]
    SourceNotFound { uri: String },

    /// The download started but did not complete (download error, other case).
    #[error("Failed to download '{uri}': {detail}")]
    DownloadFailed { uri: String, detail: String },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The downloaded file could not be read or is not valid UTF-8.
    #[error("Could not convert '{path}': {detail}")]
    ConversionFailed { path: String, detail: String },

    /// The rendered HTML could not be written to the working directory.
    #[error("Failed to write HTML file '{path}': {detail}")]
    OutputWriteFailed { path: String, detail: String },

    // ── Destination errors ────────────────────────────────────────────────
    /// The destination object write was rejected.
    #[error("Failed to upload '{path}' to '{uri}': {detail}")]
    UploadFailed {
        path: String,
        uri: String,
        detail: String,
    },

    /// The queue refused to delete the message; it will be redelivered.
    #[error("Failed to acknowledge message '{message_id}': {detail}")]
    AcknowledgmentFailed { message_id: String, detail: String },

    // ── Infrastructure errors ─────────────────────────────────────────────
    /// The per-record scratch directory could not be created.
    #[error("Could not create working directory: {detail}")]
    WorkspaceUnavailable { detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Md2HtmlError {
    /// Short machine-friendly name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Md2HtmlError::MalformedMessage { .. } => "malformed_message",
            Md2HtmlError::SizeUnknown { .. } => "size_unknown",
            Md2HtmlError::ObjectTooLarge { .. } => "object_too_large",
            Md2HtmlError::SourceNotFound { .. } => "source_not_found",
            Md2HtmlError::DownloadFailed { .. } => "download_failed",
            Md2HtmlError::ConversionFailed { .. } => "conversion_failed",
            Md2HtmlError::OutputWriteFailed { .. } => "output_write_failed",
            Md2HtmlError::UploadFailed { .. } => "upload_failed",
            Md2HtmlError::AcknowledgmentFailed { .. } => "acknowledgment_failed",
            Md2HtmlError::WorkspaceUnavailable { .. } => "workspace_unavailable",
            Md2HtmlError::InvalidConfig { .. } => "invalid_config",
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Md2HtmlError::MalformedMessage {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Md2HtmlError::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Errors returned by [`crate::storage::ObjectStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The bucket or key does not exist.
    #[error("object not found")]
    NotFound,

    /// The object grew past the download limit; `received` bytes had
    /// arrived when the transfer was abandoned.
    #[error("object exceeds the download limit ({received} bytes received)")]
    LimitExceeded { received: u64 },

    /// The storage service returned an error.
    #[error("{0}")]
    Backend(String),

    /// Local file I/O failed while streaming to or from the store.
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by [`crate::queue::MessageQueue`] implementations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue service returned an error.
    #[error("{0}")]
    Backend(String),

    /// The receipt handle is not known to the queue.
    #[error("unknown receipt handle '{0}'")]
    UnknownReceipt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_large_display() {
        let e = Md2HtmlError::ObjectTooLarge {
            uri: "s3://src/big.md".into(),
            size: 125_829_120,
            max: 104_857_600,
        };
        let msg = e.to_string();
        assert!(msg.contains("s3://src/big.md"), "got: {msg}");
        assert!(msg.contains("104857600"), "got: {msg}");
    }

    #[test]
    fn not_found_display() {
        let e = Md2HtmlError::SourceNotFound {
            uri: "s3://src/missing.md".into(),
        };
        assert!(e.to_string().contains("does not exist"));
    }

    #[test]
    fn kind_is_stable() {
        assert_eq!(Md2HtmlError::malformed("x").kind(), "malformed_message");
        assert_eq!(
            Md2HtmlError::AcknowledgmentFailed {
                message_id: "m".into(),
                detail: "d".into(),
            }
            .kind(),
            "acknowledgment_failed"
        );
    }

    #[test]
    fn serialises_with_kind_tag() {
        let e = Md2HtmlError::UploadFailed {
            path: "/tmp/x.html".into(),
            uri: "s3://target/x.html".into(),
            detail: "denied".into(),
        };
        let json = serde_json::to_value(&e).expect("serialise");
        assert_eq!(json["kind"], "upload_failed");
        assert_eq!(json["detail"], "denied");
    }

    #[test]
    fn store_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let e: StoreError = io.into();
        assert!(e.to_string().contains("disk full"));
    }
}
