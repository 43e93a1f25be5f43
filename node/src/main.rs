// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # hmy-rosetta
//!
//! Entry point for the `hmy-rosetta` binary. Parses CLI arguments,
//! initializes logging and metrics, loads the chain snapshot and serves the
//! Rosetta API.
//!
//! - `run`: serve the API for one shard
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use hmy_rosetta::chain::{ChainReader, MemoryChain};
use hmy_rosetta::config::ROSETTA_VERSION;

use cli::{Commands, RosettaCli};
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RosettaCli::parse();

    match cli.command {
        Commands::Run(args) => run_server(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Loads the snapshot and serves the API and metrics endpoints until a
/// shutdown signal arrives.
async fn run_server(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&args.log_format),
    );

    let config = args.rosetta_config();
    tracing::info!(
        network = %config.network(),
        shard = config.shard_id(),
        port = args.port,
        metrics_port = args.metrics_port,
        snapshot = %args.snapshot.display(),
        "starting hmy-rosetta"
    );

    // --- Chain data ---
    let chain = MemoryChain::load(&args.snapshot)
        .with_context(|| format!("failed to load snapshot {}", args.snapshot.display()))?;
    if chain.shard_id() != config.shard_id() {
        anyhow::bail!(
            "snapshot holds shard {} but shard {} was requested",
            chain.shard_id(),
            config.shard_id()
        );
    }
    let chain = Arc::new(chain);

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);

    // --- API server ---
    let api_router = api::create_router(api::AppState::new(
        &config,
        chain,
        Arc::clone(&node_metrics),
    ));
    let api_addr = format!("0.0.0.0:{}", args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("Rosetta API listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    tracing::info!("hmy-rosetta stopped");
    Ok(())
}

fn print_version() {
    println!("hmy-rosetta {}", env!("CARGO_PKG_VERSION"));
    println!("rosetta     {}", ROSETTA_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// If a handler cannot be installed that signal is never awaited.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
