mod config;
mod routes;
mod sse;

use crate::config::Config;
use crate::routes::{create_router, AppState};
use anyhow::{Context, Result};
use dotenv::dotenv;
use linecast_core::{EspnGameSource, HubRegistry, RedisUpdateProducer};
use linecast_core::redis::DEFAULT_MIRROR_BUFFER;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Linecast stream gateway...");

    let config = Config::from_env();
    info!(
        "Config: bind={} poll={:?} buffer={} espn={}",
        config.bind_addr, config.poll_interval, config.bridge_buffer, config.espn_base_url
    );

    let source = Arc::new(EspnGameSource::new(
        config.espn_base_url.clone(),
        config.espn_timeout,
    ));
    let mut registry = HubRegistry::new(source, config.hub_config());

    // Redis mirror is optional; the gateway serves SSE without it
    if let Some(redis_url) = &config.redis_url {
        match RedisUpdateProducer::connect(redis_url, DEFAULT_MIRROR_BUFFER).await {
            Ok(producer) => registry = registry.with_producer(Arc::new(producer)),
            Err(e) => warn!("Redis mirror disabled: {:#}", e),
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = create_router(AppState {
        registry: Arc::new(registry),
        bridge_buffer: config.bridge_buffer,
        sse_keepalive: config.sse_keepalive,
        shutdown: shutdown_rx,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // End open SSE streams so in-flight connections can drain
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("Server error")?;

    info!("Stream gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
