//! Ingestion loop tests against a local upstream stand-in.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch};
use zeus_core::FlightBatch;
use zeus_opensky::OpenSkyClient;
use zeus_server::config::Config;
use zeus_server::loops::ingestion_loop::run_ingestion_loop;

struct Upstream {
    url: String,
    hits: Arc<AtomicUsize>,
}

/// Serve the queued responses in order, then 503 forever.
async fn upstream(responses: Vec<(u16, Value)>) -> Upstream {
    let queue = Arc::new(Mutex::new(VecDeque::from(responses)));
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/api/states/all",
        get(move || {
            let queue = queue.clone();
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let next = queue.lock().unwrap().pop_front();
                let (code, body) = next.unwrap_or((503, json!({})));
                (StatusCode::from_u16(code).unwrap(), Json(body))
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Upstream {
        url: format!("http://{addr}/api/states/all"),
        hits,
    }
}

fn states_body(time: f64) -> Value {
    json!({
        "time": time,
        "states": [
            ["a1b2c3", "UAL123", "United States", time, time, -122.4, 37.6,
             3000.0, false, 200.0, 90.0, 0.0],
            ["nopos1", "", "United States", null, time, null, null,
             null, true, null, null, null]
        ]
    })
}

fn fast_config(url: &str) -> Config {
    let mut config = Config::from_lookup(|_| None);
    config.opensky_url = url.to_string();
    config.poll_interval = Duration::from_millis(20);
    config.backoff_max = Duration::from_millis(40);
    config
}

async fn next_batch(rx: &mut mpsc::UnboundedReceiver<String>) -> FlightBatch {
    let payload = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("batch in time")
        .expect("channel open");
    serde_json::from_str(&payload).unwrap()
}

#[tokio::test]
async fn publishes_one_batch_per_successful_poll() {
    let upstream = upstream(vec![
        (429, json!({})),
        (200, states_body(1.0)),
        (200, json!({"time": 1.5, "states": null})),
        (200, json!({"time": 1.7, "states": []})),
        (200, states_body(2.0)),
    ])
    .await;
    let config = fast_config(&upstream.url);
    let client = OpenSkyClient::new(config.opensky_url.clone(), Duration::from_secs(5)).unwrap();
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<String>();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(run_ingestion_loop(client, config, raw_tx, shutdown_rx));

    let first = next_batch(&mut raw_rx).await;
    assert_eq!(first.timestamp, 1.0);
    let ids: Vec<&str> = first.aircraft.iter().map(|a| a.icao24.as_str()).collect();
    assert_eq!(ids, vec!["a1b2c3"]);

    // Empty polls in between publish nothing.
    assert_eq!(next_batch(&mut raw_rx).await.timestamp, 2.0);

    // Upstream now fails; the loop keeps retrying without publishing.
    let served = upstream.hits.load(Ordering::SeqCst);
    tokio::time::timeout(Duration::from_secs(5), async {
        while upstream.hits.load(Ordering::SeqCst) < served + 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("loop retries after failures");

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop exits on shutdown")
        .unwrap();
    assert!(raw_rx.try_recv().is_err());
}

#[tokio::test]
async fn stops_when_raw_channel_closes() {
    let upstream = upstream((0..50).map(|i| (200, states_body(i as f64))).collect()).await;
    let config = fast_config(&upstream.url);
    let client = OpenSkyClient::new(config.opensky_url.clone(), Duration::from_secs(5)).unwrap();
    let (raw_tx, raw_rx) = mpsc::unbounded_channel::<String>();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    drop(raw_rx);

    tokio::time::timeout(
        Duration::from_secs(5),
        run_ingestion_loop(client, config, raw_tx, shutdown_rx),
    )
    .await
    .expect("loop exits when the raw channel closes");
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 1);
}
