// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! The launch queue consumer: pulls tokens off the queue fed by
//! [`crate::pipeline::Pipeline`] and the API's REST surface alike, resolves
//! each through the mapping layers, and runs the result.

use std::sync::Arc;

use tokio::sync::mpsc;
use zt_config::Instance;
use zt_core::{HistoryEntry, Platform, Token};
use zt_mapping::MappingStore;
use zt_state::State;

/// Resolves `token` through the mapping layers and runs the resulting
/// ZapScript, or the token's own text if nothing overrides it. Returns
/// whether the script actually launched media.
pub async fn launch_token(
    token: &Token,
    cfg: &Instance,
    platform: &dyn Platform,
    mapping_db: &dyn MappingStore,
) -> Result<bool, zt_launcher::LaunchError> {
    let script = zt_mapping::resolve(token, mapping_db, cfg, platform).unwrap_or_else(|| token.text.clone());
    zt_launcher::execute(&script, cfg, platform).await
}

/// Drains `launch_rx` until it closes, running each token in turn. A
/// failure plays the fail sound and is logged; the queue keeps running.
///
/// A successful launch that actually started media is reported on
/// `software_token_tx` rather than written to [`zt_state::State`] directly —
/// [`crate::pipeline::Pipeline`] is the sole writer of the software token,
/// since it must also decide whether this arrival cancels a pending exit
/// timer. Every attempt, successful or not, is appended to `state`'s launch
/// history regardless, since that log carries no arbitration logic.
pub async fn run(
    mut launch_rx: mpsc::Receiver<Token>,
    cfg: Arc<Instance>,
    platform: Arc<dyn Platform>,
    mapping_db: Arc<dyn MappingStore>,
    software_token_tx: mpsc::Sender<Option<Token>>,
    state: Arc<State>,
) {
    while let Some(token) = launch_rx.recv().await {
        tracing::info!(uid = %token.uid, "launching token");
        match launch_token(&token, &cfg, platform.as_ref(), mapping_db.as_ref()).await {
            Ok(launched) => {
                state.record_history(HistoryEntry::new(&token, true));
                if launched && software_token_tx.send(Some(token)).await.is_err() {
                    tracing::warn!("software token queue closed, dropping update");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "error launching token");
                platform.play_fail_sound(&cfg);
                state.record_history(HistoryEntry::new(&token, false));
            }
        }
    }
}
