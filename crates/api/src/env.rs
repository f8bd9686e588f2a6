// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! [`RequestEnv`]: the explicit bundle of collaborators a method handler is
//! given, rather than reaching into ambient globals.

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;
use zt_config::Instance;
use zt_core::{Platform, Token};
use zt_mapping::MappingStore;
use zt_state::State;

use crate::registry::ClientRegistry;

#[derive(Clone)]
pub struct RequestEnv {
    pub platform: Arc<dyn Platform>,
    pub config: Arc<Instance>,
    pub state: Arc<State>,
    pub mapping_db: Arc<dyn MappingStore>,
    pub token_queue: mpsc::Sender<Token>,
    pub clients: Arc<ClientRegistry>,
    pub is_local: bool,
    pub id: Uuid,
    pub params: Option<serde_json::Value>,
}
