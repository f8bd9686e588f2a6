use assert_cmd::Command;

use crate::prelude::zaparood_binary;

fn cmd() -> Command {
    Command::new(zaparood_binary())
}

#[test]
fn version_flag_prints_version_and_exits_zero() {
    let assert = cmd().arg("--version").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.starts_with("zaparood "), "stdout: {stdout}");
}

#[test]
fn short_version_flag_is_an_alias() {
    cmd().arg("-v").assert().success();
}

#[test]
fn help_flag_prints_usage_and_exits_zero() {
    let assert = cmd().arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();

    let version = env!("CARGO_PKG_VERSION");
    let expected = format!(
        "zaparood {version}\n\
         Background service that dispatches scanned tokens to host media launches.\n\
         \n\
         USAGE:\n\
         \x20   zaparood\n\
         \n\
         OPTIONS:\n\
         \x20   -h, --help       Print help information\n\
         \x20   -v, --version    Print version information\n"
    );
    similar_asserts::assert_eq!(stdout, expected);
}

#[test]
fn help_subcommand_is_an_alias_for_help_flag() {
    cmd().arg("help").assert().success();
}
