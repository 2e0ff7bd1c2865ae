//! Message queue seam.
//!
//! Under Lambda the runtime hands the batch over directly, so the processor
//! only calls [`MessageQueue::delete`]. The long-polling worker also uses
//! [`MessageQueue::receive`].

use crate::error::QueueError;
use crate::event::InboundMessage;
use async_trait::async_trait;
use std::time::Duration;

pub mod memory;
#[cfg(feature = "aws")]
pub mod sqs;

pub use memory::MemoryQueue;
#[cfg(feature = "aws")]
pub use sqs::SqsMessageQueue;

/// Operations the worker performs against the trigger queue.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Receive up to `max_messages`, waiting at most `wait` for the first one.
    /// An empty vector means the wait elapsed with nothing to do.
    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<InboundMessage>, QueueError>;

    /// Delete (acknowledge) a delivered message.
    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError>;
}
