//! Stage hand-off between the ingestion, processing and broadcast tasks.
//!
//! Loops are generic over these traits so tests can drive them with plain
//! in-memory channels.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use zeus_core::FlightBatch;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("downstream channel closed")]
    Closed,
    #[error("failed to encode flight batch: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Serialized batches arriving from an upstream stage.
pub trait MessageSource: Send {
    /// Next serialized batch, or `None` once the producer is gone.
    ///
    /// Must be cancel-safe: the processing loop races it against shutdown.
    fn next_message(&mut self) -> impl Future<Output = Option<String>> + Send;
}

/// Destination for a finished batch.
pub trait MessageSink: Send + Sync {
    fn publish(&self, batch: &FlightBatch) -> Result<(), ChannelError>;
}

impl MessageSource for mpsc::UnboundedReceiver<String> {
    async fn next_message(&mut self) -> Option<String> {
        self.recv().await
    }
}

impl MessageSource for mpsc::Receiver<String> {
    async fn next_message(&mut self) -> Option<String> {
        self.recv().await
    }
}

impl MessageSink for mpsc::UnboundedSender<String> {
    fn publish(&self, batch: &FlightBatch) -> Result<(), ChannelError> {
        let payload = batch.to_json()?;
        self.send(payload).map_err(|_| ChannelError::Closed)
    }
}

impl<T: MessageSink + ?Sized> MessageSink for Arc<T> {
    fn publish(&self, batch: &FlightBatch) -> Result<(), ChannelError> {
        (**self).publish(batch)
    }
}
