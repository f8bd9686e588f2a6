//! A config file with a schema version the binary doesn't understand is a
//! fatal startup error, not a warning — the daemon must not come up serving
//! stale or misinterpreted config.

use crate::prelude::Daemon;

#[test]
fn mismatched_schema_version_is_a_fatal_startup_error() {
    let mut daemon = Daemon::spawn("config_schema = 999\n");

    let status = daemon
        .wait_for_exit(3000)
        .expect("daemon should exit rather than hang on a bad schema version");
    assert!(!status.success());

    let stderr = daemon.stderr_so_far();
    assert!(stderr.contains("schema"), "stderr: {stderr}");
}
