use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_server_command_available() {
    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("server"));
}

#[test]
fn test_server_requires_existing_dir() {
    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("server").arg("--dir").arg("./no-such-directory");

    cmd.assert().failure();
}
