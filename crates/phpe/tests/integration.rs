//! Integration tests for the phpe CLI

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use predicates::prelude::*;
use tempfile::TempDir;

/// Command wired to a throwaway config and a deliberately missing engine
/// library, so tests behave the same whether or not PHP is installed.
fn phpe_cmd(config_dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("phpe");
    cmd.env("PHPE_CONFIG", config_dir.path().join("phpe.toml"));
    cmd.env("PHPE_ENGINE_LIB", "/nonexistent/libphp_embed_bridge.so");
    cmd
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    phpe_cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("phpe"));
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    phpe_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Embedded PHP runner"));
}

#[test]
fn test_invalid_command() {
    let dir = TempDir::new().unwrap();
    phpe_cmd(&dir).arg("invalid").assert().failure();
}

#[test]
fn test_config_path() {
    let dir = TempDir::new().unwrap();
    phpe_cmd(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("phpe.toml"));
}

#[test]
fn test_config_show_empty() {
    let dir = TempDir::new().unwrap();
    phpe_cmd(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration:"));
}

#[test]
fn test_config_set_then_show() {
    let dir = TempDir::new().unwrap();
    phpe_cmd(&dir)
        .args(["config", "set", "ini.memory_limit", "64M"])
        .assert()
        .success();

    phpe_cmd(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ini.memory_limit"))
        .stdout(predicate::str::contains("64M"));
}

#[test]
fn test_config_set_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    phpe_cmd(&dir)
        .args(["config", "set", "bogus", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown config key"));
}

#[test]
fn test_eval_without_engine_reports_initialization_failure() {
    let dir = TempDir::new().unwrap();
    phpe_cmd(&dir)
        .args(["eval", "echo 1+1;"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("initialization failed"));
}

#[test]
fn test_stdin_flags_conflict() {
    let dir = TempDir::new().unwrap();
    phpe_cmd(&dir)
        .args([
            "eval",
            "echo 1;",
            "--stdin",
            "text",
            "--stdin-json",
            "{}",
        ])
        .assert()
        .failure();
}

#[test]
fn test_run_requires_a_script_argument() {
    let dir = TempDir::new().unwrap();
    phpe_cmd(&dir).arg("run").assert().failure();
}

#[test]
fn test_eval_rejects_malformed_ini_pair() {
    let dir = TempDir::new().unwrap();
    phpe_cmd(&dir)
        .args(["eval", "echo 1;", "--ini", "no-equals-sign"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
}
