// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! Runs a parsed [`Script`] against a [`Platform`].

use thiserror::Error;
use zt_config::Instance;
use zt_core::{CmdEnv, Platform, PlatformError};

use crate::parser::{self, Command, Directive, Script};

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("execute not allowed: {0}")]
    ExecuteNotAllowed(String),
    #[error("run not allowed: {0}")]
    RunNotAllowed(String),
    #[error("invalid delay argument: {0}")]
    InvalidDelay(String),
    #[error("execute command is empty")]
    EmptyExecute,
    #[error("{0}")]
    UnmatchedQuote(#[from] parser::UnmatchedQuote),
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Executes `text` as ZapScript, returning whether any command in it
/// actually launched media (as opposed to e.g. only emitting key presses or
/// sleeping) — the caller uses this to decide whether to record a new
/// software token.
pub async fn execute(text: &str, cfg: &Instance, platform: &dyn Platform) -> Result<bool, LaunchError> {
    match parser::parse(text) {
        Script::Direct(Directive::System(id)) => {
            platform.launch_system(cfg, &id).await?;
            Ok(true)
        }
        Script::Direct(Directive::Path(path)) => {
            if !cfg.is_run_allowed(&path) {
                return Err(LaunchError::RunNotAllowed(path));
            }
            platform.launch_file(cfg, &path).await?;
            Ok(true)
        }
        Script::Commands(commands) => {
            let mut launched = false;
            for command in commands {
                launched |= run_command(&command, cfg, platform).await?;
            }
            Ok(launched)
        }
    }
}

async fn run_command(command: &Command, cfg: &Instance, platform: &dyn Platform) -> Result<bool, LaunchError> {
    match command.name.as_str() {
        "delay" => {
            let ms: u64 = command
                .args
                .parse()
                .map_err(|_| LaunchError::InvalidDelay(command.args.clone()))?;
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
            Ok(false)
        }
        "execute" => {
            cmd_execute(&command.args, cfg)?;
            Ok(false)
        }
        "launch.system" => {
            platform.launch_system(cfg, &command.args).await?;
            Ok(true)
        }
        "launch.file" => {
            if !cfg.is_file_allowed(&command.args) {
                return Err(LaunchError::RunNotAllowed(command.args.clone()));
            }
            platform.launch_file(cfg, &command.args).await?;
            Ok(true)
        }
        "input.keyboard" => {
            platform.keyboard_input(&command.args)?;
            Ok(false)
        }
        "input.key" => {
            platform.keyboard_press(&command.args)?;
            Ok(false)
        }
        "input.gamepad" => {
            platform.gamepad_press(&command.args)?;
            Ok(false)
        }
        other => {
            let env = CmdEnv {
                name: other.to_string(),
                args: command.args.clone(),
            };
            platform.forward_cmd(cfg, &env).await?;
            Ok(false)
        }
    }
}

/// Ports `cmdExecute` from the reference implementation: basic shell
/// execution gated by the `zapscript.allow_execute` allow-list, with a
/// quote-aware (if quote-preserving) argument splitter.
fn cmd_execute(args: &str, cfg: &Instance) -> Result<(), LaunchError> {
    if !cfg.is_execute_allowed(args) {
        return Err(LaunchError::ExecuteNotAllowed(args.to_string()));
    }

    let tokens = parser::tokenize_execute_args(args)?;
    let Some((cmd, cmd_args)) = tokens.split_first() else {
        return Err(LaunchError::EmptyExecute);
    };

    std::process::Command::new(cmd).args(cmd_args).status()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use zt_core::{LauncherInfo, Notification, NotifySender, Reader, Token};

    struct RecordingPlatform {
        launched_files: parking_lot::Mutex<Vec<String>>,
        launched_systems: parking_lot::Mutex<Vec<String>>,
    }

    impl RecordingPlatform {
        fn new() -> Self {
            Self {
                launched_files: parking_lot::Mutex::new(Vec::new()),
                launched_systems: parking_lot::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Platform for RecordingPlatform {
        fn id(&self) -> &'static str {
            "test"
        }
        fn supported_readers(&self, _cfg: &Instance) -> Vec<Arc<dyn Reader>> {
            vec![]
        }
        async fn start_pre(&self, _cfg: &Instance) -> Result<(), PlatformError> {
            Ok(())
        }
        async fn start_post(&self, _cfg: &Instance, _notify: NotifySender) -> Result<(), PlatformError> {
            Ok(())
        }
        async fn stop(&self) -> Result<(), PlatformError> {
            Ok(())
        }
        fn after_scan_hook(&self, _cfg: &Instance, _token: &Token) {}
        fn readers_update_hook(&self, _readers: &[Arc<dyn Reader>]) {}
        fn root_dirs(&self, _cfg: &Instance) -> Vec<PathBuf> {
            vec![]
        }
        fn zips_as_dirs(&self) -> bool {
            false
        }
        fn data_dir(&self) -> PathBuf {
            PathBuf::new()
        }
        fn log_dir(&self) -> PathBuf {
            PathBuf::new()
        }
        fn config_dir(&self) -> PathBuf {
            PathBuf::new()
        }
        fn temp_dir(&self) -> PathBuf {
            PathBuf::new()
        }
        fn normalize_path(&self, _cfg: &Instance, path: &str) -> String {
            path.to_string()
        }
        async fn kill_launcher(&self) -> Result<(), PlatformError> {
            Ok(())
        }
        fn get_active_launcher(&self) -> String {
            String::new()
        }
        fn play_fail_sound(&self, _cfg: &Instance) {}
        fn play_success_sound(&self, _cfg: &Instance) {}
        fn active_system(&self) -> String {
            String::new()
        }
        fn active_game(&self) -> String {
            String::new()
        }
        fn active_game_name(&self) -> String {
            String::new()
        }
        fn active_game_path(&self) -> String {
            String::new()
        }
        async fn launch_system(&self, _cfg: &Instance, id: &str) -> Result<(), PlatformError> {
            self.launched_systems.lock().push(id.to_string());
            Ok(())
        }
        async fn launch_file(&self, _cfg: &Instance, path: &str) -> Result<(), PlatformError> {
            self.launched_files.lock().push(path.to_string());
            Ok(())
        }
        fn keyboard_input(&self, _input: &str) -> Result<(), PlatformError> {
            Ok(())
        }
        fn keyboard_press(&self, _key: &str) -> Result<(), PlatformError> {
            Ok(())
        }
        fn gamepad_press(&self, _button: &str) -> Result<(), PlatformError> {
            Ok(())
        }
        fn lookup_mapping(&self, _cfg: &Instance, _token: &Token) -> (String, bool) {
            (String::new(), false)
        }
        fn launchers(&self, _cfg: &Instance) -> Vec<LauncherInfo> {
            vec![]
        }
    }

    fn test_cfg() -> Instance {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Instance::load(dir.path()).expect("load");
        cfg.update(|v| {
            v.launchers.allow_file = vec!["*".to_string()];
            v.service.allow_run = vec!["*".to_string()];
        })
        .expect("update");
        cfg
    }

    #[tokio::test]
    async fn direct_text_launches_file_when_allowed() {
        let cfg = test_cfg();
        let platform = RecordingPlatform::new();
        execute("/media/games/mario.nes", &cfg, &platform)
            .await
            .expect("execute");
        assert_eq!(
            platform.launched_files.lock().clone(),
            vec!["/media/games/mario.nes".to_string()]
        );
    }

    #[tokio::test]
    async fn launch_system_command_dispatches_to_platform() {
        let cfg = test_cfg();
        let platform = RecordingPlatform::new();
        execute("launch.system snes", &cfg, &platform)
            .await
            .expect("execute");
        assert_eq!(platform.launched_systems.lock().clone(), vec!["snes".to_string()]);
    }

    #[tokio::test]
    async fn direct_text_rejected_when_not_in_allow_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Instance::load(dir.path()).expect("load");
        let platform = RecordingPlatform::new();
        let result = execute("/media/games/mario.nes", &cfg, &platform).await;
        assert!(matches!(result, Err(LaunchError::RunNotAllowed(_))));
    }

    #[tokio::test]
    async fn execute_with_unmatched_quote_is_rejected() {
        let cfg = Instance::load(tempfile::tempdir().expect("tempdir").path()).expect("load");
        cfg.update(|v| v.zapscript.allow_execute = vec!["*".to_string()])
            .expect("update");
        let platform = RecordingPlatform::new();
        let result = execute(r#"execute echo "unterminated"#, &cfg, &platform).await;
        assert!(matches!(result, Err(LaunchError::UnmatchedQuote(_))));
    }

    #[tokio::test]
    async fn chained_delay_then_launch_runs_in_order() {
        let cfg = test_cfg();
        let platform = RecordingPlatform::new();
        execute("delay 1||launch.system snes", &cfg, &platform)
            .await
            .expect("execute");
        assert_eq!(platform.launched_systems.lock().clone(), vec!["snes".to_string()]);
    }
}
