// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! zt-api: the JSON-RPC-over-WebSocket and REST surfaces the daemon exposes
//! over HTTP, sharing one router and one [`AppState`].

mod env;
mod error;
mod methods;
mod models;
mod registry;
mod rest;
mod ws;

pub use env::RequestEnv;
pub use error::RpcError;
pub use registry::ClientRegistry;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use zt_config::Instance;
use zt_core::{Platform, Token};
use zt_mapping::MappingStore;
use zt_state::State;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Collaborators shared by every connection; handlers build a per-request
/// [`RequestEnv`] out of this plus the caller's address and frame.
#[derive(Clone)]
pub struct AppState {
    pub platform: Arc<dyn Platform>,
    pub config: Arc<Instance>,
    pub state: Arc<State>,
    pub mapping_db: Arc<dyn MappingStore>,
    pub token_queue: mpsc::Sender<Token>,
    pub clients: Arc<ClientRegistry>,
}

fn allowed_origin(origin: &HeaderValue, _parts: &axum::http::request::Parts) -> bool {
    origin
        .to_str()
        .map(|o| {
            o.starts_with("https://") || o.starts_with("http://") || o.starts_with("capacitor://")
        })
        .unwrap_or(false)
}

fn router(app: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(allowed_origin))
        .allow_methods([Method::GET])
        .allow_headers([header::ACCEPT]);

    Router::new()
        .route("/api", get(ws::ws_handler))
        .route("/api/v0", get(ws::ws_handler))
        .route("/api/v0.1", get(ws::ws_handler))
        .route("/r/{*path}", get(rest::run_handler))
        .route("/run/{*path}", get(rest::run_handler))
        .route("/l/{*path}", get(rest::run_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors)
        .with_state(app)
}

/// Binds `addr` and serves the JSON-RPC/WebSocket and REST surfaces until
/// `shutdown` resolves. Wiring in `ConnectInfo` lets handlers tell loopback
/// peers from remote ones for [`RequestEnv::is_local`].
pub async fn serve(
    addr: SocketAddr,
    app: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "api server listening");
    axum::serve(
        listener,
        router(app).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
