use assert_cmd::Command;

use crate::prelude::zaparood_binary;

#[test]
fn unknown_argument_exits_nonzero_with_usage_on_stderr() {
    let assert = Command::new(zaparood_binary())
        .arg("--bogus")
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("unexpected argument"), "stderr: {stderr}");
    assert!(stderr.contains("Usage:"), "stderr: {stderr}");
}
