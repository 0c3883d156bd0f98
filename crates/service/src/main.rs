//! Entry point for the CityQuest HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use core_types::config::{EncoderBackend, load_dotenv, load_or_create_config};
use image_embedding::EmbeddingProvider;
use service::{AppState, build_router, init_tracing_with_config};
use tokio::net::TcpListener;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Debug, Parser)]
#[command(name = "cityquest-server", about = "CityQuest image comparison server")]
struct Args {
    /// Config file (default: $CITYQUEST_CONFIG or config/cityquest.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the encoder backend from the config file.
    #[arg(long)]
    backend: Option<EncoderBackend>,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    let mut cfg = load_or_create_config(args.config.as_deref())?;
    if let Some(backend) = args.backend {
        cfg.model.backend = backend;
    }
    let _guard = init_tracing_with_config(&cfg.logging)?;
    tracing::info!(backend = ?cfg.model.backend, "starting CityQuest image comparison server");

    // Loading weights is slow blocking I/O; do it before accepting traffic.
    let model_cfg = cfg.model.clone();
    let provider = tokio::task::spawn_blocking(move || EmbeddingProvider::from_config(&model_cfg))
        .await
        .context("model loader panicked")?
        .context("initialising embedding model")?;

    let state = AppState::new(&cfg, Arc::new(provider));
    if let Err(err) = state.catalog.ensure_root() {
        tracing::warn!(error = %err, "could not create quests directory");
    }
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.server.host, cfg.server.port))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "server ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "cannot listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
