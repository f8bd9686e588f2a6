// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! The dispatch pipeline: the single consumer of reader scans that decides
//! what a scan means — a new token to launch, a duplicate to ignore, a
//! removal that may start the exit timer — and forwards survivors onto the
//! launch queue for [`crate::executor`] to run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use zt_config::Instance;
use zt_core::{scans_equal, Platform, Scan, Token};
use zt_mapping::MappingStore;
use zt_state::State;

use crate::executor;

const PLAY_FAIL_DEBOUNCE: Duration = Duration::from_secs(1);

struct ExitTimer {
    handle: JoinHandle<()>,
    generation: Arc<AtomicU64>,
    my_generation: u64,
}

impl ExitTimer {
    /// Cancels the timer if it hasn't fired yet. Returns whether this call
    /// actually stopped it (mirrors `time.Timer.Stop`'s return value).
    fn cancel(self) -> bool {
        self.handle.abort();
        self.generation
            .compare_exchange(
                self.my_generation,
                self.my_generation + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

/// Owns the scan-dedup/exit-timer state machine. One instance per running
/// daemon; [`Pipeline::run`] is the only place that mutates its internal
/// (non-shared) bookkeeping, so no locking is needed around it.
///
/// Decided and executed are kept separate: this struct only ever decides
/// *whether* a token should launch, and hands survivors to `launch_tx` — the
/// same queue the API's REST surface feeds directly (bypassing dedup
/// entirely, since a REST call is an explicit one-off action, not a scan to
/// debounce against). [`crate::executor::run`] is the other end.
pub struct Pipeline {
    state: Arc<State>,
    cfg: Arc<Instance>,
    platform: Arc<dyn Platform>,
    mapping_db: Arc<dyn MappingStore>,
    launch_tx: mpsc::Sender<Token>,
    software_token_tx: mpsc::Sender<Option<Token>>,
}

impl Pipeline {
    pub fn new(
        state: Arc<State>,
        cfg: Arc<Instance>,
        platform: Arc<dyn Platform>,
        mapping_db: Arc<dyn MappingStore>,
        launch_tx: mpsc::Sender<Token>,
        software_token_tx: mpsc::Sender<Option<Token>>,
    ) -> Self {
        Self {
            state,
            cfg,
            platform,
            mapping_db,
            launch_tx,
            software_token_tx,
        }
    }

    /// Whether a removed token should start the exit timer: only in hold
    /// mode, only when something is actually running, never for remote
    /// (API-originated) scans, and never for a system on the ignore list.
    fn should_exit(&self, was_remote: bool) -> bool {
        if !self.cfg.hold_mode_enabled() {
            return false;
        }
        if self.platform.get_active_launcher().is_empty() {
            return false;
        }
        if was_remote {
            return false;
        }
        let active_system = self.platform.active_system();
        if self
            .cfg
            .ignore_system()
            .iter()
            .any(|s| s.eq_ignore_ascii_case(&active_system))
        {
            return false;
        }
        true
    }

    fn start_timed_exit(&self, exit_timer: &mut Option<ExitTimer>) {
        if let Some(prev) = exit_timer.take() {
            if prev.cancel() {
                tracing::info!("cancelling previous exit timer");
            }
        }

        let delay = Duration::from_secs_f32(self.cfg.exit_delay_secs().max(0.0));
        tracing::debug!(?delay, "exit timer set");

        let generation = Arc::new(AtomicU64::new(0));
        let my_generation = 0;
        let task_generation = generation.clone();

        let state = self.state.clone();
        let cfg = self.cfg.clone();
        let platform = self.platform.clone();
        let mapping_db = self.mapping_db.clone();
        let software_token_tx = self.software_token_tx.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if task_generation.load(Ordering::SeqCst) != my_generation {
                return;
            }

            if !cfg.hold_mode_enabled() {
                tracing::debug!("exit timer expired, but hold mode disabled");
                return;
            }

            let active_launcher = platform.get_active_launcher();
            let soft_token = state.software_token();
            if active_launcher.is_empty() || soft_token.is_none() {
                tracing::debug!("no active launcher, not exiting");
                return;
            }

            if let Some(launcher) = platform
                .launchers(&cfg)
                .into_iter()
                .find(|l| l.id == active_launcher)
            {
                if let Some(defaults) = cfg.lookup_system_defaults(&launcher.system_id) {
                    if !defaults.before_exit.is_empty() {
                        tracing::info!(script = %defaults.before_exit, "running before-exit script");
                        let token = Token::now("", defaults.before_exit.clone());
                        if let Err(e) =
                            executor::launch_token(&token, &cfg, platform.as_ref(), mapping_db.as_ref()).await
                        {
                            tracing::warn!(error = %e, "error running before-exit script");
                        }
                    }
                }
            }

            tracing::info!("exiting media");
            if let Err(e) = platform.kill_launcher().await {
                tracing::warn!(error = %e, "error killing launcher");
            }
            if software_token_tx.send(None).await.is_err() {
                tracing::warn!("software token queue closed, dropping update");
            }
        });

        *exit_timer = Some(ExitTimer {
            handle,
            generation,
            my_generation,
        });
    }

    /// Runs the pipeline until `scan_rx` closes (daemon shutdown).
    pub async fn run(
        &self,
        mut scan_rx: mpsc::Receiver<Scan>,
        mut software_token_rx: mpsc::Receiver<Option<Token>>,
    ) {
        let mut prev_token: Option<Token> = None;
        let mut exit_timer: Option<ExitTimer> = None;
        let mut last_error: Option<Instant> = None;

        loop {
            if self.state.stop_requested() {
                break;
            }

            tokio::select! {
                scan = scan_rx.recv() => {
                    let Some(scan) = scan else { break };

                    if let Some(error) = scan.error {
                        tracing::error!(error, "error reading card");
                        if last_error.map(|t| t.elapsed() > PLAY_FAIL_DEBOUNCE).unwrap_or(true) {
                            self.platform.play_fail_sound(&self.cfg);
                        }
                        last_error = Some(Instant::now());
                        continue;
                    }

                    self.handle_scan(scan.token, &mut prev_token, &mut exit_timer).await;
                }
                soft = software_token_rx.recv() => {
                    let Some(soft_token) = soft else { break };
                    tracing::debug!(?soft_token, "new software token");

                    if let Some(timer) = exit_timer.take() {
                        if !scans_equal(soft_token.as_ref(), self.state.software_token().as_ref())
                            && timer.cancel()
                        {
                            tracing::info!("different software token inserted, cancelling exit");
                        }
                    }
                    self.state.set_software_token(soft_token);
                }
            }
        }
    }

    async fn handle_scan(
        &self,
        scan: Option<Token>,
        prev_token: &mut Option<Token>,
        exit_timer: &mut Option<ExitTimer>,
    ) {
        if scans_equal(scan.as_ref(), prev_token.as_ref()) {
            tracing::debug!("ignoring duplicate scan");
            return;
        }
        let was_remote = prev_token.as_ref().map(|t| t.remote).unwrap_or(false);
        *prev_token = scan.clone();

        let Some(scan) = scan else {
            tracing::info!("token was removed");
            self.state.set_active_card(None);
            if self.should_exit(was_remote) {
                self.start_timed_exit(exit_timer);
            }
            return;
        };

        tracing::info!(uid = %scan.uid, "new token scanned");
        self.state.set_active_card(Some(scan.clone()));

        if !self.state.can_run_zap_script() {
            tracing::debug!("skipping token, run ZapScript disabled");
            return;
        }

        if let Some(timer) = exit_timer.take() {
            let same_as_software = scans_equal(Some(&scan), self.state.software_token().as_ref());
            if timer.cancel() {
                if same_as_software {
                    tracing::info!("same token reinserted, cancelling exit");
                    return;
                }
                tracing::info!("new token inserted, restarting exit timer");
                self.start_timed_exit(exit_timer);
            }
        }

        if scans_equal(Some(&scan), self.state.wrote_token().as_ref()) {
            tracing::info!("skipping launching just written token");
            self.state.set_wrote_token(None);
            return;
        }
        self.state.set_wrote_token(None);

        tracing::info!(uid = %scan.uid, "queueing token for launch");
        self.platform.play_success_sound(&self.cfg);
        if self.launch_tx.send(scan).await.is_err() {
            tracing::error!("launch queue closed, dropping token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor;
    use std::path::PathBuf;
    use zt_core::{LauncherInfo, NotifySender, PlatformError, Reader};
    use zt_mapping::MemoryStore;

    struct FakePlatform {
        active_launcher: parking_lot::Mutex<String>,
        launched: parking_lot::Mutex<Vec<String>>,
        events: parking_lot::Mutex<Vec<String>>,
        launcher_info: Vec<LauncherInfo>,
    }

    impl FakePlatform {
        fn new() -> Self {
            Self {
                active_launcher: parking_lot::Mutex::new(String::new()),
                launched: parking_lot::Mutex::new(Vec::new()),
                events: parking_lot::Mutex::new(Vec::new()),
                launcher_info: Vec::new(),
            }
        }
    }

    #[async_trait::async_trait]
    impl Platform for FakePlatform {
        fn id(&self) -> &'static str {
            "fake"
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
            self.events.lock().push("kill".to_string());
            *self.active_launcher.lock() = String::new();
            Ok(())
        }
        fn get_active_launcher(&self) -> String {
            self.active_launcher.lock().clone()
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
            self.launched.lock().push(id.to_string());
            self.events.lock().push(format!("launch:{id}"));
            *self.active_launcher.lock() = "test-launcher".to_string();
            Ok(())
        }
        async fn launch_file(&self, _cfg: &Instance, path: &str) -> Result<(), PlatformError> {
            self.launched.lock().push(path.to_string());
            self.events.lock().push(format!("launch:{path}"));
            *self.active_launcher.lock() = "test-launcher".to_string();
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
            self.launcher_info.clone()
        }
    }

    fn test_cfg() -> Instance {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Instance::load(dir.path()).expect("load");
        cfg.update(|v| {
            v.service.allow_run = vec!["*".to_string()];
        })
        .expect("update");
        cfg
    }

    #[tokio::test]
    async fn duplicate_scan_is_ignored() {
        let state = Arc::new(State::new());
        let cfg = Arc::new(test_cfg());
        let platform = Arc::new(FakePlatform::new());
        let db = Arc::new(MemoryStore::default());
        let (launch_tx, launch_rx) = mpsc::channel(8);
        let (soft_tx, soft_rx) = mpsc::channel(8);
        let pipeline = Pipeline::new(
            state.clone(),
            cfg.clone(),
            platform.clone(),
            db.clone(),
            launch_tx,
            soft_tx.clone(),
        );

        let (scan_tx, scan_rx) = mpsc::channel(8);

        let token = Token::now("04a1b2", "/media/a.rom");
        scan_tx.send(Scan::inserted(token.clone())).await.expect("send");
        scan_tx.send(Scan::inserted(token)).await.expect("send dup");
        drop(scan_tx);

        pipeline.run(scan_rx, soft_rx).await;
        drop(pipeline);

        executor::run(launch_rx, cfg, platform.clone(), db, soft_tx, state).await;
        assert_eq!(platform.launched.lock().len(), 1);
    }

    #[tokio::test]
    async fn removal_without_hold_mode_does_not_start_exit_timer() {
        let state = Arc::new(State::new());
        let cfg = Arc::new(test_cfg());
        let platform = Arc::new(FakePlatform {
            active_launcher: parking_lot::Mutex::new("test-launcher".to_string()),
            ..FakePlatform::new()
        });
        let db = Arc::new(MemoryStore::default());
        let (launch_tx, _launch_rx) = mpsc::channel(8);
        let (soft_tx, soft_rx) = mpsc::channel(8);
        let pipeline = Pipeline::new(state.clone(), cfg, platform, db, launch_tx, soft_tx);

        let (scan_tx, scan_rx) = mpsc::channel(8);

        scan_tx.send(Scan::removed()).await.expect("send");
        drop(scan_tx);

        pipeline.run(scan_rx, soft_rx).await;
        assert!(state.active_card().is_none());
    }

    #[tokio::test]
    async fn before_exit_script_runs_to_completion_before_kill_launcher() {
        let state = Arc::new(State::new());
        state.set_software_token(Some(Token::now("04a1b2", "/media/a.rom")));

        let cfg = Arc::new(test_cfg());
        cfg.update(|v| {
            v.readers.scan.mode = zt_config::SCAN_MODE_HOLD.to_string();
            v.readers.scan.exit_delay = 0.01;
            v.systems.default = vec![zt_config::SystemsDefault {
                system: "snes".to_string(),
                launcher: String::new(),
                before_exit: "systems/cleanup".to_string(),
            }];
        })
        .expect("update");

        let platform = Arc::new(FakePlatform {
            active_launcher: parking_lot::Mutex::new("test-launcher".to_string()),
            launcher_info: vec![LauncherInfo {
                id: "test-launcher".to_string(),
                system_id: "snes".to_string(),
            }],
            ..FakePlatform::new()
        });
        let db = Arc::new(MemoryStore::default());
        let (launch_tx, _launch_rx) = mpsc::channel(8);
        let (soft_tx, soft_rx) = mpsc::channel(8);
        let pipeline = Pipeline::new(state.clone(), cfg, platform.clone(), db, launch_tx, soft_tx);

        let mut exit_timer = None;
        pipeline.start_timed_exit(&mut exit_timer);
        exit_timer.expect("exit timer armed").handle.await.expect("join");
        drop(soft_rx);

        assert_eq!(platform.events.lock().clone(), vec!["launch:cleanup".to_string(), "kill".to_string()]);
    }
}
