// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! WebSocket transport: JSON-RPC 2.0 request/response framing, a raw-text
//! `"ping"`/`"pong"` heartbeat out-of-band to JSON-RPC, and per-connection
//! forwarding of [`zt_state::State`] notifications onto the socket.

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, State as AxumState, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;
use zt_core::Notification;

use crate::env::RequestEnv;
use crate::methods;
use crate::models::{RequestObject, ResponseObject};
use crate::AppState;

pub async fn ws_handler(
    AxumState(app): AxumState<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, app, addr))
}

async fn handle_connection(socket: WebSocket, app: AppState, addr: SocketAddr) {
    let client_id = Uuid::new_v4();
    let is_local = addr.ip().is_loopback();
    app.clients.add(client_id, addr.to_string());

    let mut notifications = app.state.subscribe();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            notification = notifications.recv() => {
                match notification {
                    Ok(n) => {
                        if sink.send(Message::Text(notification_frame(&n).into())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(peer = %addr, skipped, "client fell behind notification bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if text == "ping" {
                            if sink.send(Message::Text("pong".into())).await.is_err() {
                                break;
                            }
                            continue;
                        }
                        if let Some(reply) = handle_frame(&text, &app, is_local).await {
                            if sink.send(Message::Text(reply.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "websocket read error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    app.clients.remove(client_id);
}

fn notification_frame(n: &Notification) -> String {
    let frame = RequestObject {
        jsonrpc: "2.0".to_string(),
        id: None,
        method: n.method.clone(),
        params: Some(n.params.clone()),
    };
    serde_json::to_string(&frame).unwrap_or_default()
}

/// Parses and dispatches one inbound frame. Returns `None` when the frame
/// needs no reply: malformed JSON, a notification (`method` but no `id`), or
/// a bare response to a server-originated request (neither of which this
/// server ever sends, so there's nothing to correlate it against).
async fn handle_frame(text: &str, app: &AppState, is_local: bool) -> Option<String> {
    let request: RequestObject = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(error = %e, "dropping malformed JSON-RPC frame");
            return None;
        }
    };

    if request.jsonrpc != "2.0" {
        tracing::debug!(jsonrpc = %request.jsonrpc, "dropping frame with unsupported jsonrpc version");
        return None;
    }

    let id = request.id?;
    if request.method.is_empty() {
        return None;
    }

    let env = RequestEnv {
        platform: app.platform.clone(),
        config: app.config.clone(),
        state: app.state.clone(),
        mapping_db: app.mapping_db.clone(),
        token_queue: app.token_queue.clone(),
        clients: app.clients.clone(),
        is_local,
        id,
        params: request.params,
    };

    let response = match methods::dispatch(&request.method, &env).await {
        Ok(value) => ResponseObject::success(id, value),
        Err(err) => ResponseObject::failure(id, err),
    };
    Some(serde_json::to_string(&response).unwrap_or_default())
}
