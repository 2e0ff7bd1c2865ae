//! # edgequake-md2html
//!
//! Queue-triggered Markdown → HTML conversion worker.
//!
//! ## Why this crate?
//!
//! Markdown lands in a bucket, a storage notification lands on a queue, and
//! somebody has to turn the former into HTML next to a target bucket without
//! ever losing a message or leaving a half-written object behind. This crate
//! is that somebody: a small, strictly sequential pipeline whose only hard
//! part is the error and cleanup sequencing around a handful of I/O calls.
//!
//! ## Pipeline Overview
//!
//! ```text
//! queue message
//!  │
//!  ├─ 1. Scratch   fresh working directory for this record
//!  ├─ 2. Parse     bucket + key from an S3 or EventBridge notification
//!  ├─ 3. Inspect   HEAD the object; refuse ≥ max_object_size before download
//!  ├─ 4. Fetch     GET into the working directory
//!  ├─ 5. Render    UTF-8 Markdown → HTML (pulldown-cmark)
//!  ├─ 6. Publish   write <key stem>.html locally, PUT to the target bucket
//!  ├─ 7. Ack       delete the message, only after every upload succeeded
//!  └─ 8. Cleanup   always; failures are logged, never escalated
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use edgequake_md2html::{
//!     InboundMessage, LocalObjectStore, MemoryQueue, MessageProcessor, WorkerConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WorkerConfig::builder().target_bucket("site").build()?;
//!     let store = Arc::new(LocalObjectStore::new("/srv/objects"));
//!     let queue = Arc::new(MemoryQueue::new());
//!     let processor = MessageProcessor::new(config, store, queue.clone());
//!
//!     let body = r#"{"Records":[{"s3":{"bucket":{"name":"docs"},"object":{"key":"readme.md"}}}]}"#;
//!     let message = InboundMessage::new("m-1", "r-1", body);
//!     queue.push(message.clone());
//!
//!     let report = processor.process_batch(&[message]).await;
//!     println!("{}", report.status());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `aws`   | on      | S3 / SQS adapters and the Lambda handler (aws-sdk-*, lambda_runtime) |
//! | `cli`   | on      | Enables the `md2html-worker` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable both when embedding the pipeline with your own adapters:
//! ```toml
//! edgequake-md2html = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod event;
#[cfg(feature = "aws")]
pub mod lambda;
pub mod output;
pub mod pipeline;
pub mod processor;
pub mod queue;
pub mod storage;
pub mod template;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    HtmlTemplate, MarkdownFlavor, WorkerConfig, WorkerConfigBuilder, DEFAULT_MAX_OBJECT_SIZE,
};
pub use error::{Md2HtmlError, QueueError, StoreError};
pub use event::{parse_message, InboundMessage, StorageObjectRef};
pub use output::{
    BatchReport, BatchStats, CleanupIssue, ConvertedObject, InvocationStatus, RecordReport,
    RecordStage,
};
pub use pipeline::render::{convert_to_file, markdown_to_html};
pub use processor::MessageProcessor;
pub use queue::{MemoryQueue, MessageQueue};
pub use storage::{LocalObjectStore, ObjectStore};

#[cfg(feature = "aws")]
pub use lambda::{function_handler, InvocationResponse};
#[cfg(feature = "aws")]
pub use queue::SqsMessageQueue;
#[cfg(feature = "aws")]
pub use storage::S3ObjectStore;
