// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! The [`Platform`] capability: the seam between the dispatch core and
//! whatever OS/frontend it runs under (a specific game launcher frontend,
//! a generic desktop, a test double).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use zt_config::Instance;

use crate::reader::Reader;
use crate::token::Token;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("launch failed: {0}")]
    LaunchFailed(String),
    #[error("not supported on this platform")]
    Unsupported,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A notification en route to the API layer's broadcast bus. Platforms use
/// this to surface events they detect independently of a token scan (e.g. a
/// frontend's own "now playing" state).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub method: String,
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

pub type NotifySender = mpsc::Sender<Notification>;

/// A launcher the platform knows how to invoke, scoped to a system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherInfo {
    pub id: String,
    pub system_id: String,
}

/// A ZapScript command forwarded to the platform because it isn't one of
/// the generic built-ins (`delay`, `execute`, `launch`, ...). Platforms that
/// add their own commands implement [`Platform::forward_cmd`]; everyone
/// else returns [`PlatformError::Unsupported`].
#[derive(Debug, Clone)]
pub struct CmdEnv {
    pub name: String,
    pub args: String,
}

/// Everything the dispatch core needs from its host environment, pulled
/// together behind one trait so the core stays testable against a fake.
#[async_trait]
pub trait Platform: Send + Sync {
    fn id(&self) -> &'static str;

    /// Reader drivers this platform wants registered by default.
    fn supported_readers(&self, cfg: &Instance) -> Vec<Arc<dyn Reader>>;

    /// Runs before any reader or API worker starts.
    async fn start_pre(&self, cfg: &Instance) -> Result<(), PlatformError>;

    /// Runs once the core is otherwise up; receives the notification sender
    /// so the platform can push its own notifications onto the bus.
    async fn start_post(&self, cfg: &Instance, notify: NotifySender) -> Result<(), PlatformError>;

    async fn stop(&self) -> Result<(), PlatformError>;

    /// Called after every token scan, success or failure, before the launch
    /// queue is touched. Platforms use this for OSD/LED feedback.
    fn after_scan_hook(&self, cfg: &Instance, token: &Token);

    /// Called whenever the reader set changes (connect/disconnect).
    fn readers_update_hook(&self, readers: &[Arc<dyn Reader>]);

    fn root_dirs(&self, cfg: &Instance) -> Vec<PathBuf>;

    /// Whether zip archives under the root dirs should be browsable as if
    /// they were directories.
    fn zips_as_dirs(&self) -> bool;

    fn data_dir(&self) -> PathBuf;
    fn log_dir(&self) -> PathBuf;
    fn config_dir(&self) -> PathBuf;
    fn temp_dir(&self) -> PathBuf;

    /// Resolves a path possibly containing platform shorthand (env vars,
    /// `%SYSTEM%`-style tokens) to an absolute filesystem path.
    fn normalize_path(&self, cfg: &Instance, path: &str) -> String;

    async fn kill_launcher(&self) -> Result<(), PlatformError>;

    /// Empty string means nothing is currently running.
    fn get_active_launcher(&self) -> String;

    fn play_fail_sound(&self, cfg: &Instance);
    fn play_success_sound(&self, cfg: &Instance);

    fn active_system(&self) -> String;
    fn active_game(&self) -> String;
    fn active_game_name(&self) -> String;
    fn active_game_path(&self) -> String;

    async fn launch_system(&self, cfg: &Instance, id: &str) -> Result<(), PlatformError>;
    async fn launch_file(&self, cfg: &Instance, path: &str) -> Result<(), PlatformError>;

    fn keyboard_input(&self, input: &str) -> Result<(), PlatformError>;
    fn keyboard_press(&self, key: &str) -> Result<(), PlatformError>;
    fn gamepad_press(&self, button: &str) -> Result<(), PlatformError>;

    /// Dispatches a non-generic ZapScript command. Default: unsupported.
    async fn forward_cmd(&self, _cfg: &Instance, _env: &CmdEnv) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }

    /// Platform-native mapping hook, consulted last in the mapping
    /// precedence chain (database, then config, then platform). Returns
    /// `(override_text, matched)`.
    fn lookup_mapping(&self, cfg: &Instance, token: &Token) -> (String, bool);

    fn launchers(&self, cfg: &Instance) -> Vec<LauncherInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_carries_method_and_params() {
        let n = Notification::new("media.started", serde_json::json!({"id": "abc"}));
        assert_eq!(n.method, "media.started");
        assert_eq!(n.params["id"], "abc");
    }
}
