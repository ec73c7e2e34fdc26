//! Integration tests for the `voyager` CLI binary.
//!
//! These tests cover argument parsing, help output, shell completions,
//! config file handling and error exit codes without a live backend.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `voyager` binary with env isolation.
///
/// Clears all `VOYAGER_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn voyager_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("voyager");
    cmd.env("HOME", "/tmp/voyager-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/voyager-cli-test-nonexistent")
        .env_remove("VOYAGER_CONFIG")
        .env_remove("VOYAGER_ACCOUNT")
        .env_remove("VOYAGER_PASSWORD")
        .env_remove("VOYAGER_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = voyager_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    voyager_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("login")
            .and(predicate::str::contains("chat"))
            .and(predicate::str::contains("vip"))
            .and(predicate::str::contains("health")),
    );
}

#[test]
fn test_version_flag() {
    voyager_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("voyager"));
}

#[test]
fn test_chat_send_requires_arguments() {
    voyager_cmd()
        .args(["chat", "send"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("SESSION_ID"));
}

#[test]
fn test_unknown_platform_is_usage_error() {
    voyager_cmd()
        .args(["vip", "products", "--platform", "windows"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown platform"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    voyager_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    voyager_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("voyager"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voyager.toml");
    voyager_cmd()
        .args(["config", "path", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("voyager.toml"));
}

#[test]
fn test_config_init_then_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voyager.toml");

    voyager_cmd()
        .args(["config", "init", "--account", "alice", "--config"])
        .arg(&path)
        .assert()
        .success();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("account = \"alice\""), "config was:\n{written}");
    assert!(written.contains("[chat]"));

    voyager_cmd()
        .args(["config", "init", "--config"])
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_config_show_masks_password() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voyager.toml");
    std::fs::write(&path, "account = \"bob\"\npassword = \"hunter2\"\n").unwrap();

    voyager_cmd()
        .args(["config", "show", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("bob")
                .and(predicate::str::contains("********"))
                .and(predicate::str::contains("hunter2").not()),
        );
}

// ── Error exit codes ────────────────────────────────────────────────

#[test]
fn test_login_without_account_exits_with_auth_code() {
    voyager_cmd()
        .arg("login")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("account"));
}

#[test]
fn test_unreachable_backends_exit_with_connection_code() {
    voyager_cmd()
        .arg("health")
        .env("VOYAGER_AUTH__BASE_URL", "http://127.0.0.1:1")
        .env("VOYAGER_CHAT__BASE_URL", "http://127.0.0.1:1")
        .env("VOYAGER_BILLING__BASE_URL", "http://127.0.0.1:1/api/vippay")
        .env("VOYAGER_RETRY__MAX_ATTEMPTS", "1")
        .assert()
        .code(7)
        .stdout(predicate::str::contains("down"));
}
