//! Per-cycle batch enrichment.
//!
//! Failures are isolated per aircraft: a record that cannot be decoded or
//! evaluated is dropped from the output and the rest of the batch proceeds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::ViolationEngine;
use crate::models::{AircraftState, AlertLevel, FlightBatch};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("unreadable flight batch: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Envelope decoded strictly; aircraft records are decoded one at a time.
#[derive(Debug, Deserialize)]
struct RawFlightBatch {
    timestamp: f64,
    #[serde(default)]
    aircraft: Vec<serde_json::Value>,
}

/// Alert counts for one enriched batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub aircraft: usize,
    pub watch: usize,
    pub warning: usize,
    pub critical: usize,
}

impl BatchSummary {
    pub fn from_batch(batch: &FlightBatch) -> Self {
        let mut summary = Self {
            aircraft: batch.aircraft.len(),
            ..Self::default()
        };
        for aircraft in &batch.aircraft {
            match aircraft.alert_level() {
                AlertLevel::None => {}
                AlertLevel::Watch => summary.watch += 1,
                AlertLevel::Warning => summary.warning += 1,
                AlertLevel::Critical => summary.critical += 1,
            }
        }
        summary
    }

    pub fn alerts(&self) -> usize {
        self.watch + self.warning + self.critical
    }
}

#[derive(Debug, Clone)]
pub struct StreamProcessor {
    engine: ViolationEngine,
}

impl StreamProcessor {
    pub fn new(engine: ViolationEngine) -> Self {
        Self { engine }
    }

    /// Enrich every aircraft in the batch, preserving input order.
    ///
    /// The output timestamp is the input timestamp.
    pub fn process_batch(&self, batch: FlightBatch) -> FlightBatch {
        let FlightBatch {
            timestamp,
            aircraft,
        } = batch;
        let total = aircraft.len();

        let enriched: Vec<AircraftState> = aircraft
            .into_iter()
            .filter_map(|mut state| match self.engine.evaluate(&state) {
                Ok(evaluation) => {
                    state.apply(evaluation);
                    Some(state)
                }
                Err(err) => {
                    tracing::warn!("Dropping aircraft from batch {}: {}", timestamp, err);
                    None
                }
            })
            .collect();

        if enriched.len() < total {
            tracing::debug!(
                "Batch {}: kept {} of {} aircraft",
                timestamp,
                enriched.len(),
                total
            );
        }

        FlightBatch::new(timestamp, enriched)
    }

    /// Decode a serialized batch and enrich it.
    ///
    /// Only an unreadable envelope fails the whole message; individual
    /// aircraft records that do not decode are dropped.
    pub fn process_message(&self, payload: &str) -> Result<FlightBatch, ProcessError> {
        let raw: RawFlightBatch = serde_json::from_str(payload)?;

        let aircraft = raw
            .aircraft
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<AircraftState>(value) {
                Ok(state) => Some(state),
                Err(err) => {
                    tracing::warn!("Skipping malformed aircraft record: {}", err);
                    None
                }
            })
            .collect();

        Ok(self.process_batch(FlightBatch::new(raw.timestamp, aircraft)))
    }
}
