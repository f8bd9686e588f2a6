//! Test helpers for behavioral specifications.
//!
//! Spawns the compiled `zaparood` binary against an isolated app directory
//! and gives tests a minimal raw-HTTP client for its REST surface, without
//! pulling an async runtime or HTTP client crate into the test binary.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

const CONNECT_POLL_MS: u64 = 20;
const STARTUP_TIMEOUT_MS: u64 = 5000;

/// Returns the path to the zaparood binary, checking llvm-cov's target
/// directory first (same convention as a coverage-instrumented build),
/// falling back to the standard debug directory.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

pub fn zaparood_binary() -> PathBuf {
    binary_path("zaparood")
}

pub fn zaparood_cmd() -> Command {
    Command::new(zaparood_binary())
}

/// Hands out distinct loopback ports so concurrently-running tests never
/// fight over the same `service.api_port`.
pub fn next_port() -> u16 {
    static NEXT: AtomicU16 = AtomicU16::new(18_000);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// A minimal config.toml body with a `[service]` table for `port` and
/// `allow_run`, plus any further tables the caller appends after it.
pub fn base_config(port: u16, allow_run: &[&str], extra: &str) -> String {
    let allow_run_toml = allow_run
        .iter()
        .map(|p| format!("\"{p}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "config_schema = 1\n\n[service]\napi_port = {port}\nallow_run = [{allow_run_toml}]\n\n{extra}"
    )
}

/// A running (or exited) daemon process bound to an isolated app dir.
/// Sends SIGTERM-equivalent shutdown (ctrl-c emulation via kill) on drop.
pub struct Daemon {
    child: Child,
    app_dir: tempfile::TempDir,
    port: u16,
}

impl Daemon {
    /// Writes `config_toml` into a fresh app dir and starts the daemon
    /// against it. Does not wait for the API port to come up; use
    /// [`Daemon::wait_for_api`] for tests that need it listening.
    pub fn spawn(config_toml: &str) -> Self {
        let app_dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(app_dir.path().join("config.toml"), config_toml).expect("write config");

        let port = parse_api_port(config_toml);

        let child = zaparood_cmd()
            .env("ZAPAROO_APP", app_dir.path())
            .env_remove("ZAPAROO_CFG")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn zaparood");

        Self { child, app_dir, port }
    }

    pub fn app_dir(&self) -> &Path {
        self.app_dir.path()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Polls the API port until it accepts a TCP connection, or panics
    /// after a few seconds.
    pub fn wait_for_api(&self) {
        let deadline = Instant::now() + Duration::from_millis(STARTUP_TIMEOUT_MS);
        loop {
            if TcpStream::connect(("127.0.0.1", self.port)).is_ok() {
                return;
            }
            if Instant::now() > deadline {
                panic!("zaparood did not open its API port within {STARTUP_TIMEOUT_MS}ms");
            }
            std::thread::sleep(Duration::from_millis(CONNECT_POLL_MS));
        }
    }

    /// Waits (with a timeout) for the process to exit on its own, returning
    /// its exit status. Used for startup-failure scenarios.
    pub fn wait_for_exit(&mut self, timeout_ms: u64) -> Option<std::process::ExitStatus> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if let Ok(Some(status)) = self.child.try_wait() {
                return Some(status);
            }
            if Instant::now() > deadline {
                return None;
            }
            std::thread::sleep(Duration::from_millis(CONNECT_POLL_MS));
        }
    }

    pub fn stderr_so_far(&mut self) -> String {
        let mut buf = String::new();
        if let Some(stderr) = self.child.stderr.as_mut() {
            let _ = stderr.read_to_string(&mut buf);
        }
        buf
    }

    /// Issues a raw `GET path` over HTTP/1.1 and returns the status code.
    pub fn get(&self, path: &str) -> u16 {
        let mut stream =
            TcpStream::connect(("127.0.0.1", self.port)).expect("connect to api port");
        let request = format!(
            "GET {path} HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\nConnection: close\r\n\r\n",
            path = path,
            port = self.port
        );
        stream.write_all(request.as_bytes()).expect("write request");

        let mut response = String::new();
        stream.read_to_string(&mut response).expect("read response");
        parse_status_code(&response)
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn parse_status_code(response: &str) -> u16 {
    response
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .unwrap_or(0)
}

fn parse_api_port(config_toml: &str) -> u16 {
    const DEFAULT_API_PORT: u16 = 7497;
    config_toml
        .lines()
        .find_map(|line| line.trim().strip_prefix("api_port = "))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_API_PORT)
}

/// Polls `condition` until it returns true or the timeout elapses.
pub fn wait_for<F: FnMut() -> bool>(timeout_ms: u64, mut condition: F) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if condition() {
            return true;
        }
        if Instant::now() > deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(CONNECT_POLL_MS));
    }
}
