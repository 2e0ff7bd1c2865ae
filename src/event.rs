//! Inbound queue messages and the storage notifications they carry.
//!
//! Two body schemas reach the conversion queue:
//!
//! ```text
//! S3 event notification     {"Records":[{"s3":{"bucket":{"name":…},"object":{"key":…}}}]}
//! EventBridge / CloudTrail  {"detail":{"requestParameters":{"bucketName":…,"key":…}}}
//! ```
//!
//! Both are accepted. S3 notifications URL-encode object keys (a space
//! arrives as `+`), so those keys are decoded; CloudTrail keys arrive verbatim.

use crate::error::Md2HtmlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One message delivered by the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Queue-assigned id, used for logging and reports.
    pub message_id: String,
    /// Opaque token required to delete the message.
    pub receipt_handle: String,
    /// JSON notification body.
    pub body: String,
}

impl InboundMessage {
    pub fn new(
        message_id: impl Into<String>,
        receipt_handle: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            receipt_handle: receipt_handle.into(),
            body: body.into(),
        }
    }
}

/// A bucket + key pair naming one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageObjectRef {
    pub bucket: String,
    pub key: String,
}

impl StorageObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// `s3://bucket/key`, the form used in logs and error messages.
    pub fn uri(&self) -> String {
        self.to_string()
    }

    /// The key as a relative filesystem path, or None if the key could
    /// escape the directory it is joined onto.
    pub fn relative_path(&self) -> Option<PathBuf> {
        key_to_relative_path(&self.key)
    }
}

impl fmt::Display for StorageObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Map an object key onto a relative path.
///
/// Rejects empty keys, folder placeholders (trailing `/`) and any `..`
/// segment. Leading slashes and `.` segments are dropped.
pub fn key_to_relative_path(key: &str) -> Option<PathBuf> {
    if key.is_empty() || key.ends_with('/') || key.contains('\0') {
        return None;
    }

    let mut path = PathBuf::new();
    for segment in key.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s => path.push(s),
        }
    }

    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}

/// Extract every source object referenced by a message.
///
/// Fails with [`Md2HtmlError::MalformedMessage`] when the receipt handle is
/// missing, the body is not JSON, neither schema matches, no object is
/// referenced, or a key cannot be mapped onto a safe local path.
pub fn parse_message(message: &InboundMessage) -> Result<Vec<StorageObjectRef>, Md2HtmlError> {
    if message.receipt_handle.trim().is_empty() {
        return Err(Md2HtmlError::malformed("message has no receipt handle"));
    }

    let objects = parse_body(&message.body)?;

    for object in &objects {
        if object.relative_path().is_none() {
            return Err(Md2HtmlError::malformed(format!(
                "object key {:?} is not a safe relative path",
                object.key
            )));
        }
    }

    Ok(objects)
}

/// Parse a notification body in either supported schema.
pub fn parse_body(body: &str) -> Result<Vec<StorageObjectRef>, Md2HtmlError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| Md2HtmlError::malformed(format!("body is not valid JSON: {e}")))?;

    let objects = if value.get("Records").is_some() {
        parse_s3_notification(value)?
    } else if value.get("detail").is_some() {
        vec![parse_cloudtrail_detail(value)?]
    } else {
        return Err(Md2HtmlError::malformed(
            "body has neither 'Records' nor 'detail'",
        ));
    };

    if objects.is_empty() {
        return Err(Md2HtmlError::malformed("body references no objects"));
    }
    Ok(objects)
}

// ── S3 event notification ────────────────────────────────────────────────

#[derive(Deserialize)]
struct S3Notification {
    #[serde(rename = "Records")]
    records: Vec<S3Record>,
}

#[derive(Deserialize)]
struct S3Record {
    s3: S3Entity,
}

#[derive(Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Deserialize)]
struct S3Object {
    key: String,
}

fn parse_s3_notification(value: serde_json::Value) -> Result<Vec<StorageObjectRef>, Md2HtmlError> {
    let notification: S3Notification = serde_json::from_value(value)
        .map_err(|e| Md2HtmlError::malformed(format!("invalid S3 notification: {e}")))?;

    notification
        .records
        .into_iter()
        .map(|record| {
            let key = decode_s3_key(&record.s3.object.key)?;
            Ok(StorageObjectRef::new(record.s3.bucket.name, key))
        })
        .collect()
}

/// Undo S3's form-style key encoding (`+` for space, `%XX` escapes).
fn decode_s3_key(raw: &str) -> Result<String, Md2HtmlError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|k| k.into_owned())
        .map_err(|e| Md2HtmlError::malformed(format!("object key {raw:?} is not valid UTF-8: {e}")))
}

// ── EventBridge / CloudTrail ─────────────────────────────────────────────

#[derive(Deserialize)]
struct CloudTrailEvent {
    detail: CloudTrailDetail,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloudTrailDetail {
    request_parameters: RequestParameters,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestParameters {
    bucket_name: String,
    key: String,
}

fn parse_cloudtrail_detail(value: serde_json::Value) -> Result<StorageObjectRef, Md2HtmlError> {
    let event: CloudTrailEvent = serde_json::from_value(value)
        .map_err(|e| Md2HtmlError::malformed(format!("invalid EventBridge event: {e}")))?;
    let params = event.detail.request_parameters;
    Ok(StorageObjectRef::new(params.bucket_name, params.key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn s3_body(bucket: &str, key: &str) -> String {
        serde_json::json!({
            "Records": [{
                "eventSource": "aws:s3",
                "eventName": "ObjectCreated:Put",
                "s3": {"bucket": {"name": bucket}, "object": {"key": key, "size": 4}}
            }]
        })
        .to_string()
    }

    #[test]
    fn parses_s3_notification() {
        let objects = parse_body(&s3_body("src", "notes/readme.md")).unwrap();
        assert_eq!(objects, vec![StorageObjectRef::new("src", "notes/readme.md")]);
    }

    #[test]
    fn decodes_s3_keys() {
        let objects = parse_body(&s3_body("src", "my+notes/caf%C3%A9.md")).unwrap();
        assert_eq!(objects[0].key, "my notes/café.md");
    }

    #[test]
    fn parses_multiple_records() {
        let body = serde_json::json!({
            "Records": [
                {"s3": {"bucket": {"name": "a"}, "object": {"key": "one.md"}}},
                {"s3": {"bucket": {"name": "b"}, "object": {"key": "two.md"}}}
            ]
        })
        .to_string();
        let objects = parse_body(&body).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[1], StorageObjectRef::new("b", "two.md"));
    }

    #[test]
    fn parses_cloudtrail_detail() {
        let body = serde_json::json!({
            "detail-type": "AWS API Call via CloudTrail",
            "detail": {
                "eventName": "PutObject",
                "requestParameters": {"bucketName": "src", "key": "docs/a b.md"}
            }
        })
        .to_string();
        let objects = parse_body(&body).unwrap();
        assert_eq!(objects, vec![StorageObjectRef::new("src", "docs/a b.md")]);
    }

    #[test]
    fn rejects_unknown_shapes() {
        for body in [
            "not json",
            "{}",
            r#"{"Records": []}"#,
            r#"{"Records": [{"s3": {"bucket": {}}}]}"#,
            r#"{"detail": {"requestParameters": {"key": "x.md"}}}"#,
        ] {
            let err = parse_body(body).unwrap_err();
            assert!(
                matches!(err, Md2HtmlError::MalformedMessage { .. }),
                "{body}: {err:?}"
            );
        }
    }

    #[test]
    fn parse_message_requires_receipt() {
        let msg = InboundMessage::new("m-1", "", s3_body("src", "a.md"));
        assert!(matches!(
            parse_message(&msg),
            Err(Md2HtmlError::MalformedMessage { .. })
        ));
    }

    #[test]
    fn parse_message_rejects_traversal() {
        let msg = InboundMessage::new("m-1", "r-1", s3_body("src", "../../etc/passwd"));
        let err = parse_message(&msg).unwrap_err();
        assert!(err.to_string().contains("safe relative path"), "got: {err}");
    }

    #[test]
    fn relative_paths() {
        assert_eq!(
            key_to_relative_path("notes/readme.md").as_deref(),
            Some(Path::new("notes/readme.md"))
        );
        assert_eq!(
            key_to_relative_path("/a//./b.md").as_deref(),
            Some(Path::new("a/b.md"))
        );
        assert_eq!(key_to_relative_path(""), None);
        assert_eq!(key_to_relative_path("folder/"), None);
        assert_eq!(key_to_relative_path("a/../b.md"), None);
        assert_eq!(key_to_relative_path("/./"), None);
    }

    #[test]
    fn display_uri() {
        let o = StorageObjectRef::new("src", "notes/readme.md");
        assert_eq!(o.uri(), "s3://src/notes/readme.md");
    }
}
