//! In-process queue used by the `replay` command and tests.

use super::MessageQueue;
use crate::error::QueueError;
use crate::event::InboundMessage;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct State {
    pending: VecDeque<InboundMessage>,
    in_flight: Vec<InboundMessage>,
    acknowledged: Vec<String>,
}

/// A [`MessageQueue`] held entirely in memory.
///
/// `receive` moves messages from pending to in-flight; `delete` accepts the
/// receipt of any pending or in-flight message and records it.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    state: Mutex<State>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a message.
    pub fn push(&self, message: InboundMessage) {
        self.lock().pending.push_back(message);
    }

    /// Receipt handles deleted so far, in deletion order.
    pub fn acknowledged(&self) -> Vec<String> {
        self.lock().acknowledged.clone()
    }

    /// Messages neither received nor deleted.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Messages received but not yet deleted.
    pub fn in_flight_len(&self) -> usize {
        self.lock().in_flight.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn receive(
        &self,
        max_messages: usize,
        _wait: Duration,
    ) -> Result<Vec<InboundMessage>, QueueError> {
        let mut state = self.lock();
        let n = max_messages.min(state.pending.len());
        let batch: Vec<InboundMessage> = state.pending.drain(..n).collect();
        state.in_flight.extend(batch.iter().cloned());
        Ok(batch)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        let mut state = self.lock();
        if let Some(i) = state
            .in_flight
            .iter()
            .position(|m| m.receipt_handle == receipt_handle)
        {
            state.in_flight.remove(i);
        } else if let Some(i) = state
            .pending
            .iter()
            .position(|m| m.receipt_handle == receipt_handle)
        {
            state.pending.remove(i);
        } else {
            return Err(QueueError::UnknownReceipt(receipt_handle.to_string()));
        }
        state.acknowledged.push(receipt_handle.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(n: usize) -> InboundMessage {
        InboundMessage::new(format!("m-{n}"), format!("r-{n}"), "{}")
    }

    #[tokio::test]
    async fn receive_respects_max() {
        let q = MemoryQueue::new();
        for n in 0..3 {
            q.push(msg(n));
        }
        let batch = q.receive(2, Duration::ZERO).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].message_id, "m-0");
        assert_eq!(q.pending_len(), 1);
        assert_eq!(q.in_flight_len(), 2);
    }

    #[tokio::test]
    async fn delete_records_receipts() {
        let q = MemoryQueue::new();
        q.push(msg(0));
        q.push(msg(1));
        let _ = q.receive(1, Duration::ZERO).await.unwrap();

        q.delete("r-0").await.unwrap();
        q.delete("r-1").await.unwrap();
        assert_eq!(q.acknowledged(), vec!["r-0", "r-1"]);
        assert_eq!(q.pending_len(), 0);
        assert_eq!(q.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn delete_unknown_receipt_fails() {
        let q = MemoryQueue::new();
        let err = q.delete("r-404").await.unwrap_err();
        assert!(matches!(err, QueueError::UnknownReceipt(_)));
        assert!(q.acknowledged().is_empty());
    }
}
