// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! A minimal, OS-generic [`Platform`] implementation.
//!
//! Real deployments of this service run under a frontend tied to a specific
//! host (a particular retro-gaming distribution, a desktop shell) that
//! supplies its own `Platform` with native launch/input/OSD behavior. This
//! one exists so the daemon binary has something to run against on a plain
//! Linux/macOS/Windows box: it launches files via the OS's own file-open
//! association and otherwise degrades gracefully.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use zt_config::Instance;
use zt_core::{CmdEnv, LauncherInfo, Notification, NotifySender, Platform, PlatformError, Reader, Token};
use zt_readers::{FileReader, PcscReader, SerialReader};

#[derive(Default)]
struct Active {
    launcher: String,
    system: String,
    game_path: String,
    game_name: String,
}

/// Tracks "what is running" in memory only — there is no real frontend to
/// query, so [`HeadlessPlatform::launch_file`]/[`HeadlessPlatform::launch_system`]
/// are the sole source of truth, and [`HeadlessPlatform::kill_launcher`] the
/// sole way to clear it.
pub struct HeadlessPlatform {
    base_dir: PathBuf,
    active: RwLock<Active>,
}

impl HeadlessPlatform {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            active: RwLock::new(Active::default()),
        }
    }
}

#[async_trait]
impl Platform for HeadlessPlatform {
    fn id(&self) -> &'static str {
        "headless"
    }

    fn supported_readers(&self, _cfg: &Instance) -> Vec<Arc<dyn Reader>> {
        vec![
            Arc::new(FileReader::new()),
            Arc::new(SerialReader::new()),
            Arc::new(PcscReader::new()),
        ]
    }

    async fn start_pre(&self, _cfg: &Instance) -> Result<(), PlatformError> {
        std::fs::create_dir_all(&self.base_dir)?;
        Ok(())
    }

    async fn start_post(&self, _cfg: &Instance, notify: NotifySender) -> Result<(), PlatformError> {
        let _ = notify
            .send(Notification::new("platform.started", serde_json::json!({ "id": self.id() })))
            .await;
        Ok(())
    }

    async fn stop(&self) -> Result<(), PlatformError> {
        Ok(())
    }

    fn after_scan_hook(&self, _cfg: &Instance, _token: &Token) {}

    fn readers_update_hook(&self, readers: &[Arc<dyn Reader>]) {
        tracing::debug!(count = readers.len(), "reader set changed");
    }

    fn root_dirs(&self, cfg: &Instance) -> Vec<PathBuf> {
        cfg.index_roots().into_iter().map(PathBuf::from).collect()
    }

    fn zips_as_dirs(&self) -> bool {
        false
    }

    fn data_dir(&self) -> PathBuf {
        self.base_dir.clone()
    }

    fn log_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    fn config_dir(&self) -> PathBuf {
        self.base_dir.clone()
    }

    fn temp_dir(&self) -> PathBuf {
        std::env::temp_dir().join("zaparoo")
    }

    fn normalize_path(&self, _cfg: &Instance, path: &str) -> String {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest).to_string_lossy().into_owned();
            }
        }
        path.to_string()
    }

    async fn kill_launcher(&self) -> Result<(), PlatformError> {
        *self.active.write() = Active::default();
        Ok(())
    }

    fn get_active_launcher(&self) -> String {
        self.active.read().launcher.clone()
    }

    fn play_fail_sound(&self, _cfg: &Instance) {}

    fn play_success_sound(&self, _cfg: &Instance) {}

    fn active_system(&self) -> String {
        self.active.read().system.clone()
    }

    fn active_game(&self) -> String {
        self.active.read().game_path.clone()
    }

    fn active_game_name(&self) -> String {
        self.active.read().game_name.clone()
    }

    fn active_game_path(&self) -> String {
        self.active.read().game_path.clone()
    }

    async fn launch_system(&self, cfg: &Instance, id: &str) -> Result<(), PlatformError> {
        let Some(defaults) = cfg.lookup_system_defaults(id) else {
            return Err(PlatformError::Unsupported);
        };
        let mut active = self.active.write();
        active.launcher = if defaults.launcher.is_empty() {
            format!("headless/{id}")
        } else {
            defaults.launcher.clone()
        };
        active.system = id.to_string();
        active.game_path.clear();
        active.game_name.clear();
        Ok(())
    }

    async fn launch_file(&self, _cfg: &Instance, path: &str) -> Result<(), PlatformError> {
        open_with_os(path)?;

        let name = PathBuf::from(path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut active = self.active.write();
        active.launcher = "headless/file".to_string();
        active.game_path = path.to_string();
        active.game_name = name;
        Ok(())
    }

    fn keyboard_input(&self, _input: &str) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }

    fn keyboard_press(&self, _key: &str) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }

    fn gamepad_press(&self, _button: &str) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }

    async fn forward_cmd(&self, _cfg: &Instance, env: &CmdEnv) -> Result<(), PlatformError> {
        tracing::warn!(cmd = %env.name, args = %env.args, "no platform handler for forwarded command");
        Err(PlatformError::Unsupported)
    }

    fn lookup_mapping(&self, _cfg: &Instance, _token: &Token) -> (String, bool) {
        (String::new(), false)
    }

    fn launchers(&self, cfg: &Instance) -> Vec<LauncherInfo> {
        cfg.systems_default()
            .into_iter()
            .map(|d| LauncherInfo {
                id: if d.launcher.is_empty() {
                    format!("headless/{}", d.system)
                } else {
                    d.launcher
                },
                system_id: d.system,
            })
            .collect()
    }
}

/// Hands `path` to the OS's own file-association mechanism rather than
/// trying to run it directly, since this platform has no notion of which
/// emulator or player a given extension maps to.
fn open_with_os(path: &str) -> Result<(), PlatformError> {
    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(path).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", "", path]).spawn()
    } else {
        Command::new("xdg-open").arg(path).spawn()
    };
    result.map(|_| ()).map_err(PlatformError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cfg(dir: &std::path::Path) -> Instance {
        Instance::load(dir).expect("load")
    }

    #[tokio::test]
    async fn launch_system_tracks_active_launcher_from_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = test_cfg(dir.path());
        cfg.update(|v| {
            v.systems.default.push(zt_config::SystemsDefault {
                system: "snes".to_string(),
                launcher: "snes9x".to_string(),
                before_exit: String::new(),
            });
        })
        .expect("update");

        let platform = HeadlessPlatform::new(dir.path().to_path_buf());
        assert!(platform.get_active_launcher().is_empty());

        platform.launch_system(&cfg, "snes").await.expect("launch");
        assert_eq!(platform.get_active_launcher(), "snes9x");
        assert_eq!(platform.active_system(), "snes");

        platform.kill_launcher().await.expect("kill");
        assert!(platform.get_active_launcher().is_empty());
    }

    #[tokio::test]
    async fn launch_system_without_defaults_is_unsupported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = test_cfg(dir.path());
        let platform = HeadlessPlatform::new(dir.path().to_path_buf());
        assert!(platform.launch_system(&cfg, "unknown").await.is_err());
    }

    #[test]
    fn normalize_path_expands_home_shorthand() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_dir = dir.path().to_path_buf();
        let cfg = test_cfg(&cfg_dir);
        let platform = HeadlessPlatform::new(cfg_dir);
        if let Some(home) = dirs::home_dir() {
            let expected = home.join("roms/snes").to_string_lossy().into_owned();
            assert_eq!(platform.normalize_path(&cfg, "~/roms/snes"), expected);
        }
    }
}
