//! http-pipeline gateway.
//!
//! ```text
//!     Client ──▶ gateway (axum) ──▶ Pipeline ──▶ HttpTransport ──▶ Upstream API
//!                   │                 │ cache / coalescing / retries / timeouts
//!                   └─ /admin/* ──────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use http_pipeline::cache::{CacheSweeper, MemoryValidatorStore};
use http_pipeline::config::{load_config, watcher::ConfigWatcher, PipelineConfig};
use http_pipeline::lifecycle::{wait_for_signal, Shutdown};
use http_pipeline::observability::{logging, metrics};
use http_pipeline::{GatewayServer, HttpTransport, Pipeline};

#[derive(Parser)]
#[command(name = "http-pipeline")]
#[command(about = "Caching, coalescing, retrying HTTP gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };

    logging::init_tracing(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "http-pipeline starting");
    tracing::info!(
        upstream = %config.upstream.base_url,
        bind_address = %config.gateway.bind_address,
        cache_max_entries = config.cache.max_entries,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let validators = match &config.validators.persistence_path {
        Some(path) => MemoryValidatorStore::load_from_file(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path, error = %e, "Starting with empty validator store");
            MemoryValidatorStore::new(Some(path.clone()))
        }),
        None => MemoryValidatorStore::default(),
    };

    let transport = Arc::new(HttpTransport::new(&config.upstream)?);
    let listener = TcpListener::bind(&config.gateway.bind_address).await?;
    let sweep_interval = Duration::from_secs(config.cache.sweep_interval_secs);
    let pipeline = Pipeline::with_validators(config, transport, Arc::new(validators.clone()));

    let shutdown = Shutdown::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    let sweeper = CacheSweeper::new(pipeline.clone(), sweep_interval);
    let sweeper_task = tokio::spawn(sweeper.run(shutdown.subscribe()));

    // The watcher handle must outlive the server.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let reload_target = pipeline.clone();
            tokio::spawn(async move {
                while let Some(new_config) = updates.recv().await {
                    reload_target.reload(new_config);
                }
            });
            match watcher.run() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::error!(error = %e, "Config hot reload disabled");
                    None
                }
            }
        }
        None => None,
    };

    GatewayServer::new(pipeline)
        .run(listener, shutdown.subscribe())
        .await?;

    let _ = sweeper_task.await;

    if let Err(e) = validators.save_to_file() {
        tracing::error!(error = %e, "Failed to persist validators");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
