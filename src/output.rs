//! Reports produced by the message processor.
//!
//! Every record yields a [`RecordReport`], success or not. A batch yields a
//! [`BatchReport`] whose [`BatchReport::status`] is the single `ok`/`fail`
//! signal handed back to the invoking runtime.

use crate::error::Md2HtmlError;
use crate::event::StorageObjectRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How far a record got through the pipeline.
///
/// Ordered: a later stage compares greater than an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStage {
    #[default]
    Start,
    Parsed,
    SizeChecked,
    Downloaded,
    Converted,
    Uploaded,
    Acknowledged,
}

/// One source object that was rendered and written to the target bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedObject {
    pub source: StorageObjectRef,
    pub destination: StorageObjectRef,
    /// Bytes downloaded from the source object.
    pub source_bytes: u64,
    /// Bytes of HTML uploaded.
    pub html_bytes: u64,
}

/// A scratch file or directory that could not be removed.
///
/// Logged and reported, never escalated to a record failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupIssue {
    pub path: PathBuf,
    pub detail: String,
}

/// Outcome of processing one queue record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordReport {
    pub message_id: String,
    /// Last stage completed; `Acknowledged` on success.
    pub stage: RecordStage,
    /// Objects uploaded before the record finished or failed.
    pub converted: Vec<ConvertedObject>,
    /// The fatal error, if the record failed.
    pub error: Option<Md2HtmlError>,
    pub cleanup_issues: Vec<CleanupIssue>,
    pub duration_ms: u64,
}

impl RecordReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate counters for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_records: usize,
    pub succeeded_records: usize,
    pub failed_records: usize,
    pub converted_objects: usize,
    pub cleanup_issues: usize,
    pub duration_ms: u64,
}

/// Outcome of one invocation batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub records: Vec<RecordReport>,
    pub stats: BatchStats,
}

impl BatchReport {
    pub(crate) fn from_records(records: Vec<RecordReport>, duration_ms: u64) -> Self {
        let succeeded = records.iter().filter(|r| r.is_success()).count();
        let stats = BatchStats {
            total_records: records.len(),
            succeeded_records: succeeded,
            failed_records: records.len() - succeeded,
            converted_objects: records.iter().map(|r| r.converted.len()).sum(),
            cleanup_issues: records.iter().map(|r| r.cleanup_issues.len()).sum(),
            duration_ms,
        };
        Self { records, stats }
    }

    /// `Ok` only if every record succeeded. An empty batch is `Ok`.
    pub fn status(&self) -> InvocationStatus {
        if self.stats.failed_records == 0 {
            InvocationStatus::Ok
        } else {
            InvocationStatus::Fail
        }
    }

    /// First record error, in batch order.
    pub fn first_error(&self) -> Option<&Md2HtmlError> {
        self.records.iter().find_map(|r| r.error.as_ref())
    }
}

/// The per-invocation `ok` / `fail` signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    Ok,
    Fail,
}

impl fmt::Display for InvocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationStatus::Ok => f.write_str("ok"),
            InvocationStatus::Fail => f.write_str("fail"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, error: Option<Md2HtmlError>, converted: usize) -> RecordReport {
        let object = ConvertedObject {
            source: StorageObjectRef::new("src", "a.md"),
            destination: StorageObjectRef::new("target", "a.html"),
            source_bytes: 4,
            html_bytes: 12,
        };
        RecordReport {
            message_id: id.into(),
            stage: if error.is_none() {
                RecordStage::Acknowledged
            } else {
                RecordStage::Parsed
            },
            converted: vec![object; converted],
            error,
            cleanup_issues: vec![],
            duration_ms: 1,
        }
    }

    #[test]
    fn empty_batch_is_ok() {
        let report = BatchReport::from_records(vec![], 0);
        assert_eq!(report.status(), InvocationStatus::Ok);
        assert_eq!(report.stats.total_records, 0);
        assert!(report.first_error().is_none());
    }

    #[test]
    fn any_failure_fails_the_batch() {
        let report = BatchReport::from_records(
            vec![
                record("m-1", None, 1),
                record("m-2", Some(Md2HtmlError::malformed("bad")), 0),
                record("m-3", None, 2),
            ],
            10,
        );
        assert_eq!(report.status(), InvocationStatus::Fail);
        assert_eq!(report.stats.succeeded_records, 2);
        assert_eq!(report.stats.failed_records, 1);
        assert_eq!(report.stats.converted_objects, 3);
        assert_eq!(
            report.first_error().map(Md2HtmlError::kind),
            Some("malformed_message")
        );
    }

    #[test]
    fn stages_are_ordered() {
        assert!(RecordStage::Start < RecordStage::Parsed);
        assert!(RecordStage::Uploaded < RecordStage::Acknowledged);
    }

    #[test]
    fn status_display() {
        assert_eq!(InvocationStatus::Ok.to_string(), "ok");
        assert_eq!(InvocationStatus::Fail.to_string(), "fail");
    }
}
