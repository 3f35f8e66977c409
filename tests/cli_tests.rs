use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn prints_help() {
    let mut cmd = Command::cargo_bin("tunes").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("iTunes Connect analytics and beta testers"));
}

#[test]
fn testers_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("tunes").unwrap();
    cmd.args(["testers", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("add-all-to-app"));
}

#[test]
fn missing_session_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("tunes").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("TUNES_SESSION")
        .args(["testers", "list"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("TUNES_SESSION"));
}

#[test]
fn rejects_malformed_dates() {
    let mut cmd = Command::cargo_bin("tunes").unwrap();
    cmd.args(["analytics", "crashes", "--app", "1", "--from", "yesterday", "--to", "2024-01-02"]);
    cmd.assert().failure().stderr(predicate::str::contains("--from"));
}

#[test]
fn internal_delete_fails_before_contacting_the_service() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("tunes").unwrap();
    // Nothing listens here; a lookup would fail with a connection error instead.
    cmd.current_dir(dir.path())
        .env("TUNES_SESSION", "myacinfo=test")
        .env("TUNES_BASE_URL", "http://127.0.0.1:9/")
        .args(["testers", "delete", "--kind", "internal", "--yes", "a@x.com"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("delete is not supported for internal testers"));
}
