//! In-memory state shared by the processing loop and the viewer endpoints.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use zeus_core::{
    BatchSummary, CoverMode, FlightBatch, MatchPolicy, RestrictedZone, SpatialIndex, ZoneCatalog,
};

use crate::channel::{ChannelError, MessageSink};

/// A connected WebSocket viewer.
#[derive(Debug, Clone, Serialize)]
pub struct Viewer {
    pub id: u64,
    pub connected_at: DateTime<Utc>,
}

/// The most recent enriched batch, already serialized.
#[derive(Debug, Clone)]
pub struct LastBatch {
    pub payload: Arc<str>,
    pub timestamp: f64,
    pub summary: BatchSummary,
    pub published_at: DateTime<Utc>,
}

/// Application state - fan-out hub for enriched batches plus the static zone view.
pub struct AppState {
    tx: broadcast::Sender<Arc<str>>,
    latest: RwLock<Option<LastBatch>>,
    viewers: DashMap<u64, Viewer>,
    viewer_counter: AtomicU64,
    zones: Vec<RestrictedZone>,
    indexed_zones: usize,
    indexed_cells: usize,
    resolution: u8,
    cover: CoverMode,
    match_policy: MatchPolicy,
}

impl AppState {
    pub fn new(
        catalog: &ZoneCatalog,
        index: &SpatialIndex,
        match_policy: MatchPolicy,
        broadcast_capacity: usize,
    ) -> Self {
        let (tx, _) = broadcast::channel(broadcast_capacity.max(1));
        Self {
            tx,
            latest: RwLock::new(None),
            viewers: DashMap::new(),
            viewer_counter: AtomicU64::new(1),
            zones: catalog.active_zones().cloned().collect(),
            indexed_zones: index.zone_count(),
            indexed_cells: index.cell_count(),
            resolution: u8::from(index.resolution()),
            cover: index.cover(),
            match_policy,
        }
    }

    /// Subscribe to enriched batch payloads.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> Option<LastBatch> {
        self.latest.read().ok().and_then(|latest| latest.clone())
    }

    pub fn zones(&self) -> &[RestrictedZone] {
        &self.zones
    }

    pub fn indexed_zones(&self) -> usize {
        self.indexed_zones
    }

    pub fn indexed_cells(&self) -> usize {
        self.indexed_cells
    }

    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    pub fn cover(&self) -> CoverMode {
        self.cover
    }

    pub fn match_policy(&self) -> MatchPolicy {
        self.match_policy
    }

    /// Register a new viewer and return its id.
    pub fn connect_viewer(&self) -> u64 {
        let id = self.viewer_counter.fetch_add(1, Ordering::SeqCst);
        self.viewers.insert(
            id,
            Viewer {
                id,
                connected_at: Utc::now(),
            },
        );
        tracing::info!("Viewer {} connected. Total: {}", id, self.viewers.len());
        id
    }

    pub fn disconnect_viewer(&self, id: u64) {
        if self.viewers.remove(&id).is_some() {
            tracing::info!("Viewer {} disconnected. Total: {}", id, self.viewers.len());
        }
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    /// Connected viewers, oldest first.
    pub fn viewers(&self) -> Vec<Viewer> {
        let mut viewers: Vec<Viewer> = self.viewers.iter().map(|r| r.value().clone()).collect();
        viewers.sort_by_key(|viewer| viewer.id);
        viewers
    }
}

impl MessageSink for AppState {
    /// Serialize once, remember it as the latest snapshot, and fan it out.
    fn publish(&self, batch: &FlightBatch) -> Result<(), ChannelError> {
        let payload: Arc<str> = Arc::from(batch.to_json()?);
        let summary = BatchSummary::from_batch(batch);

        if summary.alerts() > 0 {
            tracing::warn!(
                "Batch {}: {} alert(s) ({} critical, {} warning, {} watch)",
                batch.timestamp,
                summary.alerts(),
                summary.critical,
                summary.warning,
                summary.watch
            );
        }

        if let Ok(mut latest) = self.latest.write() {
            *latest = Some(LastBatch {
                payload: payload.clone(),
                timestamp: batch.timestamp,
                summary,
                published_at: Utc::now(),
            });
        }

        // Only fails when nobody is subscribed.
        match self.tx.send(payload) {
            Ok(receivers) => tracing::debug!("Broadcast batch to {} viewer(s)", receivers),
            Err(_) => tracing::debug!("No viewers connected; batch kept as latest snapshot"),
        }
        Ok(())
    }
}
