//! Zeus Server - live airspace monitor with restricted-zone alerts

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zeus_core::{SpatialIndex, StreamProcessor, ViolationEngine, ZoneCatalog};
use zeus_opensky::OpenSkyClient;
use zeus_server::config::Config;
use zeus_server::state::AppState;
use zeus_server::{api, loops};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("zeus_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting Zeus Server...");

    let config = Config::from_env();

    let catalog = match &config.zones_file {
        Some(path) => ZoneCatalog::from_file(path)
            .with_context(|| format!("loading zone catalog {}", path.display()))?,
        None => ZoneCatalog::builtin(),
    };
    let mut index = SpatialIndex::new(config.cell_resolution).with_cover(config.zone_cover);
    index.index_catalog(&catalog);
    let index = Arc::new(index);
    let processor = StreamProcessor::new(ViolationEngine::with_policy(
        index.clone(),
        config.match_policy,
    ));
    let state = Arc::new(AppState::new(
        &catalog,
        &index,
        config.match_policy,
        config.broadcast_capacity,
    ));

    let client = OpenSkyClient::new(config.opensky_url.clone(), config.http_timeout)?;
    let (raw_tx, raw_rx) = mpsc::unbounded_channel::<String>();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start background loops
    let ingestion = tokio::spawn(loops::ingestion_loop::run_ingestion_loop(
        client,
        config.clone(),
        raw_tx,
        shutdown_rx.clone(),
    ));
    let processing = tokio::spawn(loops::processing_loop::run_processing_loop(
        processor,
        raw_rx,
        state.clone(),
        shutdown_rx,
    ));

    // Build the app
    let app = api::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Run server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    if let Err(err) = ingestion.await {
        tracing::error!("Ingestion task failed: {}", err);
    }
    match processing.await {
        Ok(stats) => tracing::info!("Processing finished: {:?}", stats),
        Err(err) => tracing::error!("Processing task failed: {}", err),
    }

    Ok(())
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
    tracing::info!("Shutting down...");
    let _ = shutdown_tx.send(true);
}
