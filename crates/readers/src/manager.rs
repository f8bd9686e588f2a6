// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! The reader manager: a one-second tick that prunes disconnected readers,
//! opens configured and auto-detected ones, and tells the platform when the
//! reader set changes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use zt_config::Instance;
use zt_core::{Platform, Scan};
use zt_state::State;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// One pass of connect/prune/detect. Exposed standalone so tests can drive
/// it without waiting on the ticker.
pub fn tick(state: &State, cfg: &Instance, platform: &dyn Platform, scan_tx: &mpsc::Sender<Scan>) {
    for conn in state.reader_conn_strings() {
        if let Some(reader) = state.get_reader(&conn) {
            if !reader.connected() {
                tracing::debug!(conn, "pruning disconnected reader");
                if let Some(removed) = state.remove_reader(&conn) {
                    close_blocking(&conn, removed);
                }
            }
        }
    }

    connect_readers(state, cfg, platform, scan_tx);

    let readers: Vec<_> = state.readers().into_iter().map(|(_, r)| r).collect();
    platform.readers_update_hook(&readers);
}

fn connect_readers(state: &State, cfg: &Instance, platform: &dyn Platform, scan_tx: &mpsc::Sender<Scan>) {
    let already_open = state.reader_conn_strings();
    let supported = platform.supported_readers(cfg);

    let mut to_connect = Vec::new();
    for (driver, path) in cfg.readers_connect() {
        let conn = format!("{driver}:{path}");
        if !already_open.contains(&conn) && !to_connect.contains(&conn) {
            to_connect.push(conn);
        }
    }

    for conn in &to_connect {
        if state.get_reader(conn).is_some() {
            continue;
        }
        let Some((driver, _)) = conn.split_once(':') else {
            tracing::warn!(conn, "invalid device connection string");
            continue;
        };
        for reader in &supported {
            if reader.ids().contains(&driver) {
                let conn = conn.clone();
                let reader = reader.clone();
                let tx = scan_tx.clone();
                open_blocking(state, &conn, reader, tx);
                break;
            }
        }
    }

    if cfg.auto_detect() {
        for reader in &supported {
            let already_open = state.reader_conn_strings();
            if let Some(detected) = reader.detect(&already_open) {
                let reader = reader.clone();
                let tx = scan_tx.clone();
                open_blocking(state, &detected, reader, tx);
            }
        }
    }
}

/// Opens `reader` at `conn` on the current Tokio runtime, blocking this
/// (synchronous) tick function until the async open resolves. The tick
/// loop itself runs inside a `tokio::task::spawn_blocking`-free context —
/// see [`run`] — so this is safe to call from async code via `block_in_place`.
fn open_blocking(state: &State, conn: &str, reader: Arc<dyn zt_core::Reader>, tx: mpsc::Sender<Scan>) {
    let result = tokio::task::block_in_place(|| {
        tokio::runtime::Handle::current().block_on(reader.open(conn, tx))
    });
    match result {
        Ok(()) => {
            tracing::info!(conn, "opened reader");
            if let Some(previous) = state.add_reader(conn.to_string(), reader) {
                close_blocking(conn, previous);
            }
        }
        Err(e) => {
            tracing::error!(conn, error = %e, "error opening reader");
        }
    }
}

/// Closes `reader` on the current Tokio runtime, blocking the caller the
/// same way [`open_blocking`] does. Errors are logged and swallowed per
/// the reader-manager's best-effort close contract.
fn close_blocking(conn: &str, reader: Arc<dyn zt_core::Reader>) {
    let result = tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(reader.close()));
    if let Err(e) = result {
        tracing::warn!(conn, error = %e, "error closing reader");
    }
}

/// Closes and deregisters every reader currently held in `state`, best
/// effort. Called once on shutdown so no handle outlives the service.
pub async fn close_all(state: &State) {
    for conn in state.reader_conn_strings() {
        if let Some(reader) = state.remove_reader(&conn) {
            if let Err(e) = reader.close().await {
                tracing::warn!(conn, error = %e, "error closing reader during shutdown");
            }
        }
    }
}

/// Runs the manager tick loop until `stop` resolves.
pub async fn run(
    state: Arc<State>,
    cfg: Arc<Instance>,
    platform: Arc<dyn Platform>,
    scan_tx: mpsc::Sender<Scan>,
    mut stop: tokio::sync::watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                tick(&state, &cfg, platform.as_ref(), &scan_tx);
            }
            _ = stop.changed() => {
                if *stop.borrow() {
                    break;
                }
            }
        }
    }
    close_all(&state).await;
}
