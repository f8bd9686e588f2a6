//! S4/S5: the REST run surface enqueues when `allow_run` permits the text,
//! and rejects with 403 otherwise, without ever spawning a sub-process for
//! a disallowed request.

use crate::prelude::{base_config, next_port, Daemon};

#[test]
fn allowed_run_is_enqueued_with_200() {
    let port = next_port();
    let config = base_config(port, &["*"], "");
    let daemon = Daemon::spawn(&config);
    daemon.wait_for_api();

    let status = daemon.get("/run/delay%20100");
    assert_eq!(status, 200);
}

#[test]
fn disallowed_run_is_rejected_with_403() {
    // Empty allow_run list denies everything.
    let port = next_port();
    let config = base_config(port, &[], "");
    let daemon = Daemon::spawn(&config);
    daemon.wait_for_api();

    let status = daemon.get("/run/execute%20rm%20-rf%20%2F");
    assert_eq!(status, 403);
}

#[test]
fn run_alias_and_deprecated_l_alias_share_the_same_gate() {
    let port = next_port();
    let config = base_config(port, &["*"], "");
    let daemon = Daemon::spawn(&config);
    daemon.wait_for_api();

    assert_eq!(daemon.get("/r/delay%201"), 200);
    assert_eq!(daemon.get("/l/delay%201"), 200);
}
