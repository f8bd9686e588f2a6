// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! zaparood: background service that turns scanned tokens into host media
//! launches.
//!
//! Architecture: a reader-manager worker feeds raw scans into the dispatch
//! pipeline, which debounces them and arbitrates against the hold-mode exit
//! timer before handing survivors to the launch executor; the API server
//! shares the same launch queue and state for its `run`/WebSocket surface.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Notify};
use tracing::{error, info};
use zt_api::{AppState, ClientRegistry};
use zt_config::Instance;
use zt_daemon::HeadlessPlatform;
use zt_mapping::JsonFileStore;
use zt_state::State;

/// Bound on every inter-worker channel. Generous enough that a burst of
/// scans or queued launches never blocks a reader thread, small enough that
/// a stuck executor shows up as backpressure rather than unbounded growth.
const CHANNEL_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("zaparood {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("zaparood {}", env!("CARGO_PKG_VERSION"));
                println!("Background service that dispatches scanned tokens to host media launches.");
                println!();
                println!("USAGE:");
                println!("    zaparood");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: zaparood [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let app_dir = app_dir();
    std::fs::create_dir_all(&app_dir)?;
    let cfg = Arc::new(Instance::load(&app_dir)?);

    let _log_guard = setup_logging(&cfg, &app_dir)?;
    info!(dir = %app_dir.display(), "starting zaparoo dispatch core");

    let platform: Arc<dyn zt_core::Platform> = Arc::new(HeadlessPlatform::new(app_dir.clone()));
    platform.start_pre(&cfg).await?;

    let state = Arc::new(State::new());
    let mapping_db: Arc<dyn zt_mapping::MappingStore> =
        Arc::new(JsonFileStore::load(app_dir.join("mappings.json"))?);

    let (notify_tx, mut notify_rx) = mpsc::channel(CHANNEL_CAPACITY);
    platform.start_post(&cfg, notify_tx).await?;
    let publisher = state.notification_publisher();
    tokio::spawn(async move {
        while let Some(n) = notify_rx.recv().await {
            publisher.publish(n);
        }
    });

    let (scan_tx, scan_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (launch_tx, launch_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (soft_tx, soft_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (stop_tx, stop_rx) = watch::channel(false);

    let reader_manager = tokio::spawn(zt_readers::run(
        state.clone(),
        cfg.clone(),
        platform.clone(),
        scan_tx,
        stop_rx,
    ));

    let pipeline = zt_dispatch::Pipeline::new(
        state.clone(),
        cfg.clone(),
        platform.clone(),
        mapping_db.clone(),
        launch_tx.clone(),
        soft_tx.clone(),
    );
    let dispatch = tokio::spawn(async move { pipeline.run(scan_rx, soft_rx).await });

    let executor = tokio::spawn(zt_dispatch::run_executor(
        launch_rx,
        cfg.clone(),
        platform.clone(),
        mapping_db.clone(),
        soft_tx,
        state.clone(),
    ));

    let app_state = AppState {
        platform: platform.clone(),
        config: cfg.clone(),
        state: state.clone(),
        mapping_db,
        token_queue: launch_tx,
        clients: Arc::new(ClientRegistry::default()),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.api_port()));
    let shutdown = Arc::new(Notify::new());
    let api_shutdown = shutdown.clone();
    let api = tokio::spawn(async move {
        if let Err(e) = zt_api::serve(addr, app_state, async move { api_shutdown.notified().await }).await {
            error!(error = %e, "api server exited with error");
        }
    });

    wait_for_shutdown_signal().await;
    info!("shutdown requested, stopping workers");

    state.request_stop();
    let _ = stop_tx.send(true);
    shutdown.notify_one();

    // Order matters: the executor only sees its launch queue close once both
    // the pipeline (reader-manager's scan_tx closing unblocks it) and the API
    // (graceful shutdown) have dropped their launch_tx handles.
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), reader_manager).await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), dispatch).await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), api).await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), executor).await;

    platform.stop().await?;
    info!("zaparoo dispatch core stopped");
    Ok(())
}

/// Waits for Ctrl-C (all platforms) or SIGTERM (Unix).
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Resolves the application directory: `ZAPAROO_APP` if set, else the OS
/// data directory joined with `zaparoo`.
fn app_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(zt_config::APP_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("zaparoo")
}

fn setup_logging(
    cfg: &Instance,
    app_dir: &std::path::Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = app_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "zaparoo.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if cfg.debug_logging() { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
