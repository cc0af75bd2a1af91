//! Geofence processing loop.
//!
//! Pulls serialized batches from the raw channel, enriches them with the
//! stream processor and publishes each finished batch downstream. Shutdown is
//! only observed while waiting for input, so a batch is either published in
//! full or not at all.

use tokio::sync::watch;
use zeus_core::StreamProcessor;

use crate::channel::{ChannelError, MessageSink, MessageSource};

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingStats {
    pub batches: u64,
    pub aircraft: u64,
    pub rejected_messages: u64,
}

/// Start the processing loop.
pub async fn run_processing_loop<S, K>(
    processor: StreamProcessor,
    mut source: S,
    sink: K,
    mut shutdown: watch::Receiver<bool>,
) -> ProcessingStats
where
    S: MessageSource,
    K: MessageSink,
{
    let mut stats = ProcessingStats::default();
    tracing::info!("Processing loop started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let message = tokio::select! {
            _ = shutdown.changed() => break,
            message = source.next_message() => message,
        };
        let Some(payload) = message else {
            tracing::info!("Raw flight channel closed");
            break;
        };

        let batch = match processor.process_message(&payload) {
            Ok(batch) => batch,
            Err(err) => {
                stats.rejected_messages += 1;
                tracing::error!("Processing error: {}", err);
                continue;
            }
        };

        let count = batch.aircraft.len();
        match sink.publish(&batch) {
            Ok(()) => {
                stats.batches += 1;
                stats.aircraft += count as u64;
                tracing::debug!("Processed {} aircraft for batch {}", count, batch.timestamp);
            }
            Err(ChannelError::Closed) => {
                tracing::warn!("Output channel closed, stopping processing loop");
                break;
            }
            Err(err) => {
                stats.rejected_messages += 1;
                tracing::error!("Failed to publish batch {}: {}", batch.timestamp, err);
            }
        }
    }

    tracing::info!(
        "Processing loop stopped after {} batch(es), {} aircraft",
        stats.batches,
        stats.aircraft
    );
    stats
}
