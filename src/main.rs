mod api;
mod config;
mod db;
mod error;
mod probe;
mod query;
mod registry;
mod sampler;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::registry::Registry;
use crate::sampler::Sampler;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Sample store ---
    let store = db::connect(&cfg).await?;
    store.init_schema().await?;

    // --- Target registry, built once and immutable from here on ---
    let registry = Arc::new(Registry::from_config(&cfg)?);
    info!(
        "Registry built: {} targets ({}:{}-{} plus static entries)",
        registry.len(),
        cfg.target_host,
        cfg.start_port,
        cfg.end_port,
    );

    let health = Arc::new(HealthState::new());
    let shutdown = CancellationToken::new();

    // --- Background sampler ---
    let sampler = Sampler::new(
        Arc::clone(&registry),
        Arc::clone(&store),
        Arc::clone(&health),
        cfg.sample_interval_secs,
        cfg.connect_timeout,
        cfg.max_workers,
    );
    let sampler_token = shutdown.clone();
    tokio::spawn(async move { sampler.run(sampler_token).await });

    // --- HTTP API server ---
    let api_state = ApiState {
        registry,
        store,
        health,
        probe_timeout: cfg.connect_timeout,
        max_workers: cfg.max_workers,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
