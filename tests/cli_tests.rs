//! CLI integration tests
//!
//! Tests the command-line interface using assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the storyteller binary, run from an empty directory
fn storyteller_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("storyteller").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("STORYTELLER_CONFIG")
        .env_remove("STORYTELLER_LAYER")
        .env_remove("STORYTELLER_OUTPUT_DIR")
        .env_remove("STORYTELLER_DOCUMENT")
        .env_remove("STORYTELLER_LOG_LEVEL");
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    let dir = TempDir::new().unwrap();
    storyteller_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Given/When/Then"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("layers"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_short_version_flag() {
    let dir = TempDir::new().unwrap();
    storyteller_cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("storyteller"));
}

// ─────────────────────────────────────────────────────────────────
// Layers Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_layers_lists_performers() {
    let dir = TempDir::new().unwrap();
    storyteller_cmd(&dir)
        .arg("layers")
        .assert()
        .success()
        .stdout(predicate::str::contains("WebUser"))
        .stdout(predicate::str::contains("(default)"))
        .stdout(predicate::str::contains("presentation"))
        .stdout(predicate::str::contains("WebUserOnRestApi"));
}

// ─────────────────────────────────────────────────────────────────
// Run Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_run_help() {
    let dir = TempDir::new().unwrap();
    storyteller_cmd(&dir)
        .arg("run")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Run the walkthrough story"))
        .stdout(predicate::str::contains("--layer"))
        .stdout(predicate::str::contains("--document"));
}

#[test]
fn test_run_narrates_to_console() {
    let dir = TempDir::new().unwrap();
    storyteller_cmd(&dir)
        .args(["run", "--document", "false"])
        .assert()
        .success()
        .stdout(predicate::str::contains("I want to register customer"))
        .stdout(predicate::str::contains("so that we increase the customer base"))
        .stdout(predicate::str::contains("as web user"))
        .stdout(predicate::str::contains("given initial customer has completed registration"))
        .stdout(predicate::str::contains("given we register and confirm customer registration"))
        .stdout(predicate::str::contains("Story written to").not());
}

#[test]
fn test_run_rest_api_layer() {
    let dir = TempDir::new().unwrap();
    storyteller_cmd(&dir)
        .args(["run", "--layer", "rest_api", "--document", "false"])
        .assert()
        .success()
        .stdout(predicate::str::contains("POST /customers"))
        .stdout(predicate::str::contains("open the registration page").not());
}

#[test]
fn test_run_writes_documents() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("stories");
    storyteller_cmd(&dir)
        .args(["run", "--output-dir"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Story written to"));

    assert!(output.join("storyteller.demo.register_customer").is_dir());
    assert!(output
        .join("storyteller.demo.register_customers_in_nested_behaviours")
        .is_dir());
}

#[test]
fn test_run_unknown_layer() {
    let dir = TempDir::new().unwrap();
    storyteller_cmd(&dir)
        .args(["run", "--layer", "mobile", "--document", "false"])
        .assert()
        .failure()
        .code(30)
        .stderr(predicate::str::contains("E300"))
        .stderr(predicate::str::contains("mobile::WebUser"));
}

#[test]
fn test_run_with_invalid_config() {
    let dir = TempDir::new().unwrap();
    storyteller_cmd(&dir)
        .arg("run")
        .arg("--config")
        .arg("/nonexistent/config.toml")
        .assert()
        .failure()
        .code(10);
}

// ─────────────────────────────────────────────────────────────────
// Verbosity Flag Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_verbose_flag() {
    let dir = TempDir::new().unwrap();
    storyteller_cmd(&dir)
        .args(["-vv", "run", "--document", "false"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Story started"));
}

#[test]
fn test_quiet_flag() {
    let dir = TempDir::new().unwrap();
    storyteller_cmd(&dir)
        .args(["--quiet", "run", "--document", "false"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

// ─────────────────────────────────────────────────────────────────
// Error Handling Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_command() {
    let dir = TempDir::new().unwrap();
    storyteller_cmd(&dir)
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_missing_subcommand() {
    let dir = TempDir::new().unwrap();
    storyteller_cmd(&dir).assert().failure();
}
