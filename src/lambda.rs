//! AWS Lambda entry point.
//!
//! The SQS event source hands the function one batch per invocation. Every
//! record is processed and cleaned up; the invocation then either returns
//! `{"status":"ok",...}` or fails with [`BatchFailed`], which the runtime
//! reports as a function error so the unacknowledged messages are
//! redelivered.

use crate::event::InboundMessage;
use crate::output::{BatchReport, InvocationStatus};
use crate::processor::MessageProcessor;
use aws_lambda_events::event::sqs::{SqsEvent, SqsMessage};
use lambda_runtime::LambdaEvent;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, info_span, Instrument};

impl From<SqsMessage> for InboundMessage {
    fn from(message: SqsMessage) -> Self {
        Self {
            message_id: message.message_id.unwrap_or_default(),
            receipt_handle: message.receipt_handle.unwrap_or_default(),
            body: message.body.unwrap_or_default(),
        }
    }
}

/// Returned to the runtime when every record succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationResponse {
    pub status: InvocationStatus,
    pub records: usize,
    pub converted: usize,
}

/// At least one record of the batch failed.
#[derive(Debug, Error)]
#[error("{failed} of {total} record(s) failed; first error: {first_error}")]
pub struct BatchFailed {
    pub failed: usize,
    pub total: usize,
    pub first_error: String,
}

/// Handle one SQS invocation.
pub async fn function_handler(
    event: LambdaEvent<SqsEvent>,
    processor: &MessageProcessor,
) -> Result<InvocationResponse, lambda_runtime::Error> {
    let LambdaEvent { payload, context } = event;
    let span = info_span!("invocation", request_id = %context.request_id);

    async move {
        let messages: Vec<InboundMessage> =
            payload.records.into_iter().map(InboundMessage::from).collect();
        info!("Received {} record(s)", messages.len());

        let report = processor.process_batch(&messages).await;
        into_response(&report).map_err(lambda_runtime::Error::from)
    }
    .instrument(span)
    .await
}

/// Collapse a batch report into the invocation result.
pub fn into_response(report: &BatchReport) -> Result<InvocationResponse, BatchFailed> {
    match report.status() {
        InvocationStatus::Ok => Ok(InvocationResponse {
            status: InvocationStatus::Ok,
            records: report.stats.total_records,
            converted: report.stats.converted_objects,
        }),
        InvocationStatus::Fail => Err(BatchFailed {
            failed: report.stats.failed_records,
            total: report.stats.total_records,
            first_error: report
                .first_error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use crate::event::StorageObjectRef;
    use crate::queue::MemoryQueue;
    use crate::storage::LocalObjectStore;
    use lambda_runtime::Context;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn sqs_event(records: &[(&str, &str, &str)]) -> SqsEvent {
        let records: Vec<_> = records
            .iter()
            .map(|(id, receipt, body)| {
                serde_json::json!({
                    "messageId": id,
                    "receiptHandle": receipt,
                    "body": body,
                    "attributes": {},
                    "messageAttributes": {},
                    "eventSource": "aws:sqs",
                })
            })
            .collect();
        serde_json::from_value(serde_json::json!({ "Records": records })).unwrap()
    }

    fn s3_body(key: &str) -> String {
        serde_json::json!({
            "Records": [{ "s3": { "bucket": { "name": "src" }, "object": { "key": key } } }]
        })
        .to_string()
    }

    fn make_processor(root: &TempDir, queue: Arc<MemoryQueue>) -> (Arc<LocalObjectStore>, MessageProcessor) {
        let store = Arc::new(LocalObjectStore::new(root.path().join("store")));
        let config = WorkerConfig::builder()
            .target_bucket("target")
            .scratch_root(root.path().join("scratch"))
            .build()
            .unwrap();
        (store.clone(), MessageProcessor::new(config, store, queue))
    }

    #[test]
    fn converts_sqs_message() {
        let event = sqs_event(&[("m-1", "r-1", "{}")]);
        let message = InboundMessage::from(event.records.into_iter().next().unwrap());
        assert_eq!(message, InboundMessage::new("m-1", "r-1", "{}"));
    }

    #[test]
    fn missing_fields_become_empty() {
        let message = InboundMessage::from(SqsMessage::default());
        assert!(message.receipt_handle.is_empty());
        assert!(message.body.is_empty());
    }

    #[tokio::test]
    async fn ok_when_every_record_succeeds() {
        let root = TempDir::new().unwrap();
        let queue = Arc::new(MemoryQueue::new());
        let (store, processor) = make_processor(&root, queue.clone());
        store
            .put_bytes(&StorageObjectRef::new("src", "a.md"), "# A")
            .await
            .unwrap();

        let body = s3_body("a.md");
        queue.push(InboundMessage::new("m-1", "r-1", body.clone()));
        let event = LambdaEvent::new(sqs_event(&[("m-1", "r-1", body.as_str())]), Context::default());
        let response = function_handler(event, &processor).await.unwrap();
        assert_eq!(
            response,
            InvocationResponse {
                status: InvocationStatus::Ok,
                records: 1,
                converted: 1,
            }
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap()["status"],
            serde_json::json!("ok")
        );
        assert_eq!(queue.acknowledged(), vec!["r-1".to_string()]);
    }

    #[tokio::test]
    async fn fails_after_processing_whole_batch() {
        let root = TempDir::new().unwrap();
        let queue = Arc::new(MemoryQueue::new());
        let (store, processor) = make_processor(&root, queue.clone());
        store
            .put_bytes(&StorageObjectRef::new("src", "b.md"), "# B")
            .await
            .unwrap();

        let body = s3_body("b.md");
        queue.push(InboundMessage::new("m-1", "r-1", "garbage"));
        queue.push(InboundMessage::new("m-2", "r-2", body.clone()));
        let event = LambdaEvent::new(
            sqs_event(&[("m-1", "r-1", "garbage"), ("m-2", "r-2", body.as_str())]),
            Context::default(),
        );
        let err = function_handler(event, &processor).await.unwrap_err();
        assert!(err.to_string().starts_with("1 of 2 record(s) failed"), "{err}");
        assert_eq!(queue.acknowledged(), vec!["r-2".to_string()]);
        assert!(store.contains(&StorageObjectRef::new("target", "b.html")).await);
    }
}
