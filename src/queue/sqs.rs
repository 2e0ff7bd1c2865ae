//! Amazon SQS adapter.

use super::MessageQueue;
use crate::error::QueueError;
use crate::event::InboundMessage;
use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client;
use std::time::Duration;
use tracing::debug;

/// SQS caps a single receive at 10 messages.
const MAX_RECEIVE_BATCH: usize = 10;
/// SQS caps long polling at 20 seconds.
const MAX_WAIT_SECS: u64 = 20;

/// A [`MessageQueue`] backed by one SQS queue.
#[derive(Debug, Clone)]
pub struct SqsMessageQueue {
    client: Client,
    queue_url: String,
}

impl SqsMessageQueue {
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }
}

#[async_trait]
impl MessageQueue for SqsMessageQueue {
    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<InboundMessage>, QueueError> {
        let max = max_messages.clamp(1, MAX_RECEIVE_BATCH) as i32;
        let wait_secs = wait.as_secs().min(MAX_WAIT_SECS) as i32;

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max)
            .wait_time_seconds(wait_secs)
            .send()
            .await
            .map_err(|err| QueueError::Backend(DisplayErrorContext(&err).to_string()))?;

        let messages: Vec<InboundMessage> = output
            .messages()
            .iter()
            .map(|m| {
                InboundMessage::new(
                    m.message_id().unwrap_or_default(),
                    m.receipt_handle().unwrap_or_default(),
                    m.body().unwrap_or_default(),
                )
            })
            .collect();

        debug!("ReceiveMessage {} → {} messages", self.queue_url, messages.len());
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_receipt_handle_is_invalid())
                {
                    QueueError::UnknownReceipt(receipt_handle.to_string())
                } else {
                    QueueError::Backend(DisplayErrorContext(&err).to_string())
                }
            })?;
        Ok(())
    }
}
