//! SIGTERM triggers the same cooperative shutdown path as Ctrl-C: workers
//! are asked to stop and the process exits cleanly rather than being killed.

#![cfg(unix)]

use crate::prelude::{base_config, next_port, Daemon};

#[test]
fn sigterm_stops_the_daemon_cleanly() {
    let port = next_port();
    let config = base_config(port, &[], "");
    let mut daemon = Daemon::spawn(&config);
    daemon.wait_for_api();

    let status = std::process::Command::new("kill")
        .args(["-TERM", &daemon.pid().to_string()])
        .status()
        .expect("send sigterm");
    assert!(status.success());

    let exit = daemon
        .wait_for_exit(5000)
        .expect("daemon should exit after sigterm");
    assert!(exit.success(), "exit status: {exit:?}");
}
