//! WebSocket streaming of enriched flight batches.
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// Handler for WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> axum::response::Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
        .into_response()
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    // Subscribe before reading the snapshot so no batch falls in between.
    let mut rx = state.subscribe();
    let viewer_id = state.connect_viewer();

    // A publish racing the subscription can arrive both as the snapshot and
    // as the first broadcast.
    let mut snapshot = state.latest().map(|latest| latest.payload);
    if let Some(payload) = &snapshot {
        if socket
            .send(Message::Text(payload.as_ref().to_owned()))
            .await
            .is_err()
        {
            state.disconnect_viewer(viewer_id);
            return;
        }
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::debug!("Viewer {} socket error: {}", viewer_id, err);
                        break;
                    }
                    None => break,
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(payload) => {
                        if is_snapshot(&mut snapshot, &payload) {
                            continue;
                        }
                        if socket.send(Message::Text(payload.as_ref().to_owned())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // A newer batch supersedes the missed ones.
                        tracing::debug!("Viewer {} skipped {} batch(es)", viewer_id, skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    state.disconnect_viewer(viewer_id);
}

/// Whether `payload` is the snapshot already sent on connect. Only the first
/// broadcast can be a repeat, so the snapshot is consumed by the first check.
fn is_snapshot(snapshot: &mut Option<Arc<str>>, payload: &Arc<str>) -> bool {
    snapshot
        .take()
        .is_some_and(|sent| Arc::ptr_eq(&sent, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MessageSink;
    use zeus_core::{
        AircraftState, FlightBatch, MatchPolicy, SpatialIndex, ZoneCatalog, DEFAULT_RESOLUTION,
    };

    fn state() -> AppState {
        let catalog = ZoneCatalog::builtin();
        let index = SpatialIndex::from_catalog(&catalog, DEFAULT_RESOLUTION);
        AppState::new(&catalog, &index, MatchPolicy::FirstMatch, 8)
    }

    fn batch(timestamp: f64) -> FlightBatch {
        FlightBatch::new(
            timestamp,
            vec![AircraftState::new("abc", 34.0, -118.0, timestamp)],
        )
    }

    #[tokio::test]
    async fn publish_between_subscribe_and_snapshot_is_sent_once() {
        let state = state();
        let mut rx = state.subscribe();
        state.publish(&batch(1.0)).unwrap();
        let mut snapshot = state.latest().map(|latest| latest.payload);

        let raced = rx.recv().await.unwrap();
        assert!(is_snapshot(&mut snapshot, &raced));

        state.publish(&batch(2.0)).unwrap();
        let next = rx.recv().await.unwrap();
        assert!(!is_snapshot(&mut snapshot, &next));
    }

    #[tokio::test]
    async fn newer_batch_after_snapshot_is_forwarded() {
        let state = state();
        state.publish(&batch(1.0)).unwrap();
        let mut rx = state.subscribe();
        let mut snapshot = state.latest().map(|latest| latest.payload);

        state.publish(&batch(2.0)).unwrap();
        let next = rx.recv().await.unwrap();
        assert!(!is_snapshot(&mut snapshot, &next));
        assert!(snapshot.is_none());
    }
}
