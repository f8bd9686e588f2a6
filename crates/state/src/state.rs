// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! The process-wide [`State`] singleton: the single source of truth the API
//! layer reads from and the dispatch pipeline writes to.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::json;
use zt_core::{scans_equal, HistoryEntry, Notification, Reader, Token};

use crate::bus::{Bus, BusHandle};

/// Bound on the in-memory launch history kept for `tokens.history`. Oldest
/// entries are dropped once this is exceeded; there is no on-disk log.
const HISTORY_CAPACITY: usize = 100;

struct Inner {
    active: Option<Token>,
    last_scanned: Option<Token>,
    software_token: Option<Token>,
    wrote_token: Option<Token>,
    readers: HashMap<String, Arc<dyn Reader>>,
    run_zap_script: bool,
    stop_requested: bool,
    history: VecDeque<HistoryEntry>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            active: None,
            last_scanned: None,
            software_token: None,
            wrote_token: None,
            readers: HashMap::new(),
            run_zap_script: true,
            stop_requested: false,
            history: VecDeque::new(),
        }
    }
}

/// Shared daemon state.
///
/// Every setter acquires the write lock, mutates, releases it, and *then*
/// publishes to the notification bus (never while the lock is held) — one
/// publish per mutation, so subscribers see exactly the sequence of changes
/// that happened, in order, with no duplicate or missing notification for
/// any single call.
pub struct State {
    inner: RwLock<Inner>,
    bus: BusHandle,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

fn token_view(token: Option<&Token>) -> serde_json::Value {
    match token {
        Some(t) => json!(t),
        None => json!(Token::default()),
    }
}

impl State {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            bus: BusHandle::new(),
        }
    }

    pub fn notification_publisher(&self) -> Bus {
        self.bus.publisher()
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Notification> {
        self.bus.subscribe()
    }

    /// Records the token currently present on a reader, or `None` once it is
    /// removed. A no-op (no mutation, no notification) when `token` equals
    /// (per [`zt_core::Token::scan_eq`]) the current active token — this is
    /// the dedup guard against repeated scans of the same physical token.
    ///
    /// `last_scanned` is sticky: a genuine (non-empty) token replaces it,
    /// but clearing the active card never does, so it always holds the most
    /// recent token the service has ever observed, even with nothing on a
    /// reader right now.
    pub fn set_active_card(&self, token: Option<Token>) {
        {
            let mut inner = self.inner.write();
            if scans_equal(inner.active.as_ref(), token.as_ref()) {
                return;
            }
            inner.active = token.clone();
            if let Some(t) = &token {
                if !t.is_empty() {
                    inner.last_scanned = Some(t.clone());
                }
            }
        }
        self.bus
            .publisher()
            .publish(Notification::new("tokens.active", token_view(token.as_ref())));
    }

    pub fn active_card(&self) -> Option<Token> {
        self.inner.read().active.clone()
    }

    pub fn last_scanned(&self) -> Option<Token> {
        self.inner.read().last_scanned.clone()
    }

    pub fn software_token(&self) -> Option<Token> {
        self.inner.read().software_token.clone()
    }

    /// Sets the software (API-injected) token, which stands in for a
    /// physical scan until cleared.
    pub fn set_software_token(&self, token: Option<Token>) {
        {
            let mut inner = self.inner.write();
            inner.software_token = token.clone();
        }
        self.bus
            .publisher()
            .publish(Notification::new("tokens.software_set", json!({ "token": token })));
    }

    pub fn wrote_token(&self) -> Option<Token> {
        self.inner.read().wrote_token.clone()
    }

    pub fn set_wrote_token(&self, token: Option<Token>) {
        {
            let mut inner = self.inner.write();
            inner.wrote_token = token.clone();
        }
        self.bus
            .publisher()
            .publish(Notification::new("tokens.wrote", json!({ "token": token })));
    }

    pub fn readers(&self) -> Vec<(String, Arc<dyn Reader>)> {
        self.inner
            .read()
            .readers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn reader_conn_strings(&self) -> Vec<String> {
        self.inner.read().readers.keys().cloned().collect()
    }

    pub fn get_reader(&self, conn_str: &str) -> Option<Arc<dyn Reader>> {
        self.inner.read().readers.get(conn_str).cloned()
    }

    /// Registers `reader` under `conn_str`. Returns whatever handle was
    /// previously registered at that key, if any — the caller (the reader
    /// manager) is responsible for closing it, since closing is async and
    /// this accessor is not.
    pub fn add_reader(&self, conn_str: String, reader: Arc<dyn Reader>) -> Option<Arc<dyn Reader>> {
        let previous = {
            let mut inner = self.inner.write();
            inner.readers.insert(conn_str.clone(), reader)
        };
        self.bus
            .publisher()
            .publish(Notification::new("readers.added", json!({ "conn": conn_str })));
        previous
    }

    pub fn remove_reader(&self, conn_str: &str) -> Option<Arc<dyn Reader>> {
        let removed = {
            let mut inner = self.inner.write();
            inner.readers.remove(conn_str)
        };
        if removed.is_some() {
            self.bus
                .publisher()
                .publish(Notification::new("readers.removed", json!({ "conn": conn_str })));
        }
        removed
    }

    /// Whether scanned tokens are allowed to launch. `false` suppresses
    /// launches but scans are still recorded in state — it is a persistent
    /// gate, not a one-shot skip.
    pub fn can_run_zap_script(&self) -> bool {
        self.inner.read().run_zap_script
    }

    pub fn set_run_zap_script(&self, run: bool) {
        self.inner.write().run_zap_script = run;
    }

    /// Appends a launch attempt to the bounded in-memory history log, oldest
    /// entries first, dropping from the front once [`HISTORY_CAPACITY`] is
    /// exceeded.
    pub fn record_history(&self, entry: HistoryEntry) {
        let mut inner = self.inner.write();
        if inner.history.len() >= HISTORY_CAPACITY {
            inner.history.pop_front();
        }
        inner.history.push_back(entry);
    }

    /// Snapshot of recorded launch attempts, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.read().history.iter().cloned().collect()
    }

    pub fn stop_requested(&self) -> bool {
        self.inner.read().stop_requested
    }

    pub fn request_stop(&self) {
        self.inner.write().stop_requested = true;
    }
}
