//! The per-record conversion pipeline and its batch driver.
//!
//! ## Record lifecycle
//!
//! ```text
//! Start ─▶ Parsed ─▶ SizeChecked ─▶ Downloaded ─▶ Converted ─▶ Uploaded ─▶ Acknowledged
//!   │         │           │              │             │            │             │
//!   └─────────┴───────────┴──── Failed(reason) ────────┴────────────┘             │
//!                                      │                                          │
//!                                      └──────────────▶ cleanup ◀─────────────────┘
//! ```
//!
//! Every record gets its own [`WorkingDirectory`]; cleanup runs whether the
//! record succeeded or not and never changes its outcome. Records are
//! processed strictly one after another, and a failure in one never stops
//! the next.

use crate::config::WorkerConfig;
use crate::error::{Md2HtmlError, QueueError};
use crate::event::{parse_message, InboundMessage, StorageObjectRef};
use crate::output::{BatchReport, CleanupIssue, ConvertedObject, RecordReport, RecordStage};
use crate::pipeline::workspace::WorkingDirectory;
use crate::pipeline::{fetch, inspect, publish, render};
use crate::queue::MessageQueue;
use crate::storage::ObjectStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Converts the objects referenced by queue messages and acknowledges them.
///
/// Holds only read-only configuration and the two adapters, so one
/// processor can serve any number of batches.
pub struct MessageProcessor {
    config: WorkerConfig,
    store: Arc<dyn ObjectStore>,
    queue: Arc<dyn MessageQueue>,
}

impl MessageProcessor {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn ObjectStore>,
        queue: Arc<dyn MessageQueue>,
    ) -> Self {
        Self {
            config,
            store,
            queue,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Process every message of a batch, in order.
    pub async fn process_batch(&self, messages: &[InboundMessage]) -> BatchReport {
        let start = Instant::now();
        info!("Processing batch of {} message(s)", messages.len());

        let mut records = Vec::with_capacity(messages.len());
        for message in messages {
            records.push(self.process_message(message).await);
        }

        let report = BatchReport::from_records(records, start.elapsed().as_millis() as u64);
        info!(
            "Batch complete: {}/{} records succeeded, {} object(s) converted, {}ms",
            report.stats.succeeded_records,
            report.stats.total_records,
            report.stats.converted_objects,
            report.stats.duration_ms
        );
        report
    }

    /// Process one message through cleanup. Never fails: the outcome is in
    /// the returned report.
    pub async fn process_message(&self, message: &InboundMessage) -> RecordReport {
        let span = info_span!("record", message_id = %message.message_id);
        self.process_record(message).instrument(span).await
    }

    /// Receive up to `max_messages` from the queue.
    pub async fn receive_batch(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<InboundMessage>, QueueError> {
        self.queue.receive(max_messages, wait).await
    }

    /// Receive one batch and process it. `None` when the queue had nothing.
    pub async fn poll_once(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Option<BatchReport>, QueueError> {
        let messages = self.receive_batch(max_messages, wait).await?;
        if messages.is_empty() {
            debug!("No messages received");
            return Ok(None);
        }
        Ok(Some(self.process_batch(&messages).await))
    }

    async fn process_record(&self, message: &InboundMessage) -> RecordReport {
        let start = Instant::now();
        let mut progress = Progress::default();

        // ── Step 1: Provision scratch space ──────────────────────────────────
        let workspace = match WorkingDirectory::create(self.config.scratch_root.as_deref()) {
            Ok(ws) => ws,
            Err(e) => {
                error!("Record failed at {:?}: {}", progress.stage, e);
                return progress.into_report(message, Some(e), Vec::new(), start);
            }
        };

        // ── Steps 2-8 ────────────────────────────────────────────────────────
        let outcome = self.run_record(message, &workspace, &mut progress).await;

        // ── Step 9: Cleanup (always) ─────────────────────────────────────────
        let cleanup_issues = workspace.cleanup();
        if !cleanup_issues.is_empty() {
            warn!(
                "{} scratch path(s) could not be removed",
                cleanup_issues.len()
            );
        }

        let error = match outcome {
            Ok(()) => {
                info!(
                    "Record complete: {} object(s) converted in {}ms",
                    progress.converted.len(),
                    start.elapsed().as_millis()
                );
                None
            }
            Err(e) => {
                error!(kind = e.kind(), "Record failed at {:?}: {}", progress.stage, e);
                Some(e)
            }
        };
        progress.into_report(message, error, cleanup_issues, start)
    }

    async fn run_record(
        &self,
        message: &InboundMessage,
        workspace: &WorkingDirectory,
        progress: &mut Progress,
    ) -> Result<(), Md2HtmlError> {
        // ── Step 2: Parse ────────────────────────────────────────────────────
        let objects = parse_message(message)?;
        progress.stage = RecordStage::Parsed;
        debug!("Message references {} object(s)", objects.len());

        // ── Steps 3-7 per object ─────────────────────────────────────────────
        for object in &objects {
            let converted = self.convert_object(object, workspace, progress).await?;
            progress.converted.push(converted);
        }

        // ── Step 8: Acknowledge ──────────────────────────────────────────────
        self.queue
            .delete(&message.receipt_handle)
            .await
            .map_err(|e| Md2HtmlError::AcknowledgmentFailed {
                message_id: message.message_id.clone(),
                detail: e.to_string(),
            })?;
        progress.stage = RecordStage::Acknowledged;
        debug!("Acknowledged message");
        Ok(())
    }

    async fn convert_object(
        &self,
        object: &StorageObjectRef,
        workspace: &WorkingDirectory,
        progress: &mut Progress,
    ) -> Result<ConvertedObject, Md2HtmlError> {
        let store = self.store.as_ref();
        let max = self.config.max_object_size;
        info!("Converting {}", object);

        let size = inspect::check_size(store, object, max).await?;
        progress.stage = RecordStage::SizeChecked;

        let (markdown_path, source_bytes) =
            fetch::download(store, object, workspace, max).await?;
        if source_bytes != size {
            debug!("{} changed size: {} → {} bytes", object, size, source_bytes);
        }
        progress.stage = RecordStage::Downloaded;

        let html =
            render::convert_file(&markdown_path, self.config.flavor, self.config.template).await?;
        progress.stage = RecordStage::Converted;

        let html_key = publish::destination_key(&object.key);
        let html_path = publish::write_html(workspace, &html_key, &html).await?;
        let destination = StorageObjectRef::new(self.config.target_bucket.clone(), html_key);
        publish::upload(store, &html_path, &destination).await?;
        progress.stage = RecordStage::Uploaded;

        Ok(ConvertedObject {
            source: object.clone(),
            destination,
            source_bytes,
            html_bytes: html.len() as u64,
        })
    }
}

#[derive(Default)]
struct Progress {
    stage: RecordStage,
    converted: Vec<ConvertedObject>,
}

impl Progress {
    fn into_report(
        self,
        message: &InboundMessage,
        error: Option<Md2HtmlError>,
        cleanup_issues: Vec<CleanupIssue>,
        start: Instant,
    ) -> RecordReport {
        RecordReport {
            message_id: message.message_id.clone(),
            stage: self.stage,
            converted: self.converted,
            error,
            cleanup_issues,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}
