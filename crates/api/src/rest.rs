// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! Synchronous REST convenience surface: `GET /r/*`, `/run/*`, and the
//! deprecated `/l/*` alias. Each is a one-shot stand-in for a `run` RPC
//! call — enqueue and return, no response payload to wait on.

use axum::extract::{Path, State as AxumState};
use axum::http::StatusCode;
use chrono::Utc;
use zt_core::{nfc_normalize, Token};

use crate::AppState;

pub async fn run_handler(AxumState(app): AxumState<AppState>, Path(path): Path<String>) -> StatusCode {
    if !app.config.is_run_allowed(&path) {
        return StatusCode::FORBIDDEN;
    }

    let token = Token {
        text: nfc_normalize(&path),
        scan_time: Utc::now(),
        remote: true,
        ..Token::default()
    };

    app.state.set_active_card(Some(token.clone()));
    if app.token_queue.send(token).await.is_err() {
        tracing::warn!("launch queue closed, dropping REST-originated run");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    StatusCode::OK
}
