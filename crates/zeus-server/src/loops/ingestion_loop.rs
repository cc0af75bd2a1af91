//! OpenSky polling loop.
//!
//! Fetches the configured bounding box once per poll interval and hands each
//! batch to the raw channel. Upstream failures (including rate limiting) back
//! off exponentially instead of retrying at the normal cadence.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use zeus_opensky::{OpenSkyClient, OpenSkyError};

use crate::backoff::Backoff;
use crate::channel::{ChannelError, MessageSink};
use crate::config::Config;

/// Start the ingestion loop.
pub async fn run_ingestion_loop<K: MessageSink>(
    client: OpenSkyClient,
    config: Config,
    sink: K,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut backoff = Backoff::new(config.poll_interval, config.backoff_max);
    tracing::info!(
        "Polling {} every {:?} for {:?}",
        client.url(),
        config.poll_interval,
        config.bounding_box
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        let started = Instant::now();
        let result = tokio::select! {
            _ = shutdown.changed() => break,
            result = client.fetch_batch(&config.bounding_box) => result,
        };

        let delay = match result {
            Ok(Some(batch)) => {
                backoff.reset();
                let count = batch.aircraft.len();
                match sink.publish(&batch) {
                    Ok(()) => tracing::info!("Published {} aircraft states", count),
                    Err(ChannelError::Closed) => {
                        tracing::warn!("Raw flight channel closed, stopping ingestion");
                        break;
                    }
                    Err(err) => tracing::error!("Failed to publish batch: {}", err),
                }
                remaining(config.poll_interval, started)
            }
            Ok(None) => {
                backoff.reset();
                tracing::debug!("OpenSky returned no states");
                remaining(config.poll_interval, started)
            }
            Err(OpenSkyError::RateLimited) => {
                let delay = backoff.fail();
                tracing::warn!("Rate limit hit. Backing off for {:?}", delay);
                delay
            }
            Err(err) => {
                let delay = backoff.fail();
                tracing::error!(
                    "Error fetching data ({} consecutive): {}. Retrying in {:?}",
                    backoff.failures(),
                    err,
                    delay
                );
                delay
            }
        };

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    tracing::info!("Ingestion loop stopped");
}

fn remaining(interval: Duration, started: Instant) -> Duration {
    interval.saturating_sub(started.elapsed())
}
