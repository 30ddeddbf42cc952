//! Catastro API Server
//!
//! Tool gateway for the Spanish cadastre OVC services and INSPIRE parcels WFS.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use catastro_api::config::CatastroConfig;
use catastro_api::handlers;
use catastro_api::metrics::install_recorder;
use catastro_api::state::AppState;

/// Catastro API Server
#[derive(Parser, Debug)]
#[command(name = "catastro-api")]
#[command(about = "Tool gateway for Catastro OVC lookups and INSPIRE parcel geometry")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8090", env = "CATASTRO_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Configuration file (YAML)
    #[arg(short, long, default_value = "config/catastro.yaml", env = "CATASTRO_CONFIG")]
    config: PathBuf,

    /// Number of worker threads
    #[arg(long, env = "CATASTRO_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build runtime with configured threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    info!("Starting Catastro API server");

    let config = CatastroConfig::load(&args.config)?;
    let metrics = install_recorder()?;
    let state = Arc::new(AppState::new(config, Some(metrics)).context("Failed to initialize application state")?);

    info!(
        callejero = %state.endpoints.callejero,
        coordenadas = %state.endpoints.coordenadas,
        wfs_cp = %state.endpoints.wfs_cp,
        "Upstream endpoints configured"
    );

    let app = handlers::router(state);

    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", args.listen))?;

    info!("Catastro API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}
