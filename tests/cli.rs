//! CLI behavior tests: startup validation, exit codes, single-cycle mode.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn tattle_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tattle"))
}

#[test]
fn zero_interval_is_a_fatal_startup_error() {
    let dir = TempDir::new().unwrap();
    let mut cmd = tattle_cmd();
    cmd.arg(dir.path()).arg("--interval").arg("0").arg("--once");
    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("interval"));
}

#[test]
fn nonexistent_root_is_a_fatal_startup_error() {
    let mut cmd = tattle_cmd();
    cmd.arg("/no/such/tattle/root").arg("--once");
    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn once_mode_scans_and_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.go"), "package main\n").unwrap();

    let mut cmd = tattle_cmd();
    cmd.arg(dir.path()).arg("--once");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("watching"))
        .stderr(predicate::str::contains("1 files"));
}

#[test]
fn invalid_config_json_is_fatal() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".tattlerc.json"), "{ nope").unwrap();

    let mut cmd = tattle_cmd();
    cmd.arg(dir.path()).arg("--once");
    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("config"));
}

#[test]
fn missing_explicit_config_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut cmd = tattle_cmd();
    cmd.arg(dir.path()).arg("--config").arg("missing.json").arg("--once");
    cmd.assert().failure().code(2);
}

#[test]
fn config_file_interval_is_honored() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".tattlerc.json"), r#"{ "interval": 7 }"#).unwrap();

    let mut cmd = tattle_cmd();
    cmd.arg(dir.path()).arg("--once");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("every 7s"));
}

#[test]
fn cli_interval_overrides_config_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".tattlerc.json"), r#"{ "interval": 7 }"#).unwrap();

    let mut cmd = tattle_cmd();
    cmd.arg(dir.path()).arg("--interval").arg("3").arg("--once");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("every 3s"));
}

#[test]
fn zero_interval_from_config_is_fatal_too() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".tattlerc.json"), r#"{ "interval": 0 }"#).unwrap();

    let mut cmd = tattle_cmd();
    cmd.arg(dir.path()).arg("--once");
    cmd.assert().failure().code(2);
}

#[test]
fn bad_ignore_glob_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut cmd = tattle_cmd();
    cmd.arg(dir.path()).arg("--ignore").arg("a{").arg("--once");
    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("ignore pattern"));
}

#[test]
fn ignored_files_are_invisible_to_the_snapshot() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.go"), "package main\n").unwrap();
    fs::create_dir_all(dir.path().join("vendor/dep")).unwrap();
    fs::write(dir.path().join("vendor/dep/dep.go"), "package dep\n").unwrap();

    let mut cmd = tattle_cmd();
    cmd.arg(dir.path()).arg("--ignore").arg("**/vendor/**").arg("--once");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("1 files"));
}

#[test]
fn help_mentions_watching() {
    let mut cmd = tattle_cmd();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("watch"));
}
