// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Key visualizer service.
//!
//! Collects key-space traffic snapshots into a layered in-memory store and
//! serves heatmaps over HTTP until interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

use keyvisual::collector::{self, FileCollector, RegionCollector};
use keyvisual::config::{CollectorMode, Config};
use keyvisual::server::{self, AppState};
use keyvisual::{LayerStore, MatrixBuilder, Timestamp};

#[derive(Parser, Debug, Clone)]
#[command(name = "keyvisual")]
#[command(about = "Serve key-space traffic heatmaps")]
#[command(version)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "KEYVISUAL_CONFIG")]
    config: Option<PathBuf>,

    /// Listen host, overrides `listen` from the config file
    #[arg(long)]
    host: Option<std::net::IpAddr>,

    /// Listen port, overrides `listen` from the config file
    #[arg(short, long)]
    port: Option<u16>,

    /// Placement driver endpoint
    #[arg(long, env = "KEYVISUAL_PD")]
    pd: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long)]
    debug: bool,

    /// Replay snapshots from a JSON-lines file instead of polling regions
    #[arg(long, hide = true)]
    keyviz_file: Option<PathBuf>,

    /// Start of the replay window, Unix seconds
    #[arg(long, hide = true)]
    keyviz_file_start: Option<Timestamp>,

    /// End of the replay window, Unix seconds
    #[arg(long, hide = true)]
    keyviz_file_end: Option<Timestamp>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(host) = self.host {
            config.listen.set_ip(host);
        }
        if let Some(port) = self.port {
            config.listen.set_port(port);
        }
        if let Some(pd) = &self.pd {
            config.collector.pd_endpoint = pd.clone();
        }
        if let Some(path) = &self.keyviz_file {
            config.collector.mode = CollectorMode::File;
            config.collector.file.path = Some(path.clone());
        }
        if let Some(start) = self.keyviz_file_start {
            config.collector.file.start = start;
        }
        if let Some(end) = self.keyviz_file_end {
            config.collector.file.end = end;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // RUST_LOG takes precedence, fallback to info (or debug with --debug)
    let fallback = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path).context("Failed to load configuration")?,
        None => Config::default(),
    };
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        listen = %config.listen,
        mode = ?config.collector.mode,
        layers = config.layers.len(),
        max_rows = config.heatmap.max_rows,
        max_cols = config.heatmap.max_cols,
        "Starting keyvisual"
    );

    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(LayerStore::new(&config.layer_configs()?));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
        }
        let _ = signal_tx.send(true);
    });

    let collector_task = spawn_collector(&config, Arc::clone(&store), shutdown_rx.clone())?;

    let state = Arc::new(AppState {
        builder: MatrixBuilder::new(store),
        heatmap: config.heatmap,
    });
    let addr: SocketAddr = config.listen;
    let served = server::run_server(state, addr, shutdown_rx).await;
    // The server may also stop on a bind or accept error.
    let _ = shutdown_tx.send(true);

    collector_task
        .await
        .context("Collector task panicked")?;
    served?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn spawn_collector(
    config: &Config,
    store: Arc<LayerStore>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let interval = config.tick_interval();
    let handle = match config.collector.mode {
        CollectorMode::Region => {
            let source = RegionCollector::new(
                &config.collector.pd_endpoint,
                config.collector.metric,
                config.request_timeout(),
            )?;
            tracing::info!(url = source.url(), metric = ?config.collector.metric, "Polling regions");
            tokio::spawn(collector::run_collector(store, source, interval, shutdown))
        }
        CollectorMode::File => {
            let file = &config.collector.file;
            let path = file
                .path
                .as_deref()
                .context("File mode requires a replay file")?;
            let source = FileCollector::open(path, file.start, file.end)?;
            tokio::spawn(collector::run_collector(store, source, interval, shutdown))
        }
    };
    Ok(handle)
}
