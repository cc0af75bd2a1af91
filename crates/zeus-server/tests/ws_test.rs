//! WebSocket viewer tests against a live listener.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use zeus_core::{
    AircraftState, FlightBatch, MatchPolicy, SpatialIndex, ZoneCatalog, DEFAULT_RESOLUTION,
};
use zeus_server::api;
use zeus_server::channel::MessageSink;
use zeus_server::state::AppState;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn state(capacity: usize) -> Arc<AppState> {
    let catalog = ZoneCatalog::builtin();
    let index = SpatialIndex::from_catalog(&catalog, DEFAULT_RESOLUTION);
    Arc::new(AppState::new(
        &catalog,
        &index,
        MatchPolicy::FirstMatch,
        capacity,
    ))
}

fn batch(timestamp: f64) -> FlightBatch {
    FlightBatch::new(
        timestamp,
        vec![AircraftState::new("abc123", 34.05, -118.25, timestamp)],
    )
}

async fn serve(state: Arc<AppState>) -> String {
    let app = api::routes().with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}/ws/flights")
}

async fn next_batch(ws: &mut Client) -> FlightBatch {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("message in time")
            .expect("stream open")
            .expect("valid frame");
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..250 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn viewer_gets_snapshot_then_new_batches_and_unregisters_on_close() {
    let state = state(8);
    state.publish(&batch(1.0)).unwrap();
    let url = serve(state.clone()).await;

    let (mut ws, _) = connect_async(url).await.unwrap();
    assert_eq!(next_batch(&mut ws).await.timestamp, 1.0);
    assert_eq!(state.viewer_count(), 1);

    state.publish(&batch(2.0)).unwrap();
    assert_eq!(next_batch(&mut ws).await.timestamp, 2.0);

    ws.close(None).await.unwrap();
    wait_for(|| state.viewer_count() == 0).await;
}

#[tokio::test]
async fn viewer_without_snapshot_waits_for_first_batch() {
    let state = state(8);
    let url = serve(state.clone()).await;

    let (mut ws, _) = connect_async(url).await.unwrap();
    wait_for(|| state.viewer_count() == 1).await;

    state.publish(&batch(5.0)).unwrap();
    assert_eq!(next_batch(&mut ws).await.timestamp, 5.0);
}

#[tokio::test]
async fn dropped_connection_unregisters_viewer() {
    let state = state(8);
    let url = serve(state.clone()).await;

    let (ws, _) = connect_async(url).await.unwrap();
    wait_for(|| state.viewer_count() == 1).await;

    drop(ws);
    wait_for(|| state.viewer_count() == 0).await;
}

#[tokio::test]
async fn lagging_viewer_skips_to_newest_batch() {
    let state = state(1);
    let url = serve(state.clone()).await;

    let (mut ws, _) = connect_async(url).await.unwrap();
    wait_for(|| state.viewer_count() == 1).await;

    for timestamp in [1.0, 2.0, 3.0, 4.0] {
        state.publish(&batch(timestamp)).unwrap();
    }

    let mut previous = 0.0;
    loop {
        let timestamp = next_batch(&mut ws).await.timestamp;
        assert!(timestamp > previous, "batches arrive in order");
        previous = timestamp;
        if timestamp == 4.0 {
            break;
        }
    }
}
