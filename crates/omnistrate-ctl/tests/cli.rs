//! Smoke tests for the `omnistrate-ctl` binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ENV_VARS: [&str; 6] = [
    "OMNISTRATE_API_URL",
    "OMNISTRATE_SERVICE_ID",
    "OMNISTRATE_ENVIRONMENT_ID",
    "OMNISTRATE_CONFIG",
    "OMNISTRATE_PASSWORD",
    "RUST_LOG",
];

fn ctl(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("omnistrate-ctl").expect("binary built");
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.arg("--config").arg(config);
    cmd
}

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().expect("tempdir");
    ctl(&dir.path().join("config.toml"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("instance"))
        .stdout(predicate::str::contains("snapshot"))
        .stdout(predicate::str::contains("mcp"));
}

#[test]
fn mcp_add_list_show_remove() {
    let dir = TempDir::new().expect("tempdir");
    let config = dir.path().join("config.toml");
    let client_config = dir.path().join("claude_desktop_config.json");

    ctl(&config)
        .args(["mcp", "add", "omnistrate", "--command", "omnistrate-ctl"])
        .args(["--arg", "mcp", "--arg", "serve", "--env", "OMNISTRATE_LOG=info"])
        .arg("--client-config")
        .arg(&client_config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Added MCP server 'omnistrate'"));

    ctl(&config)
        .args(["mcp", "list", "--client-config"])
        .arg(&client_config)
        .assert()
        .success()
        .stdout(predicate::str::contains("omnistrate-ctl mcp serve"));

    ctl(&config)
        .args(["--format", "json", "mcp", "show", "omnistrate", "--client-config"])
        .arg(&client_config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"OMNISTRATE_LOG\": \"info\""));

    ctl(&config)
        .args(["mcp", "add", "omnistrate", "--command", "other", "--client-config"])
        .arg(&client_config)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--force"));

    ctl(&config)
        .args(["mcp", "remove", "omnistrate", "--client-config"])
        .arg(&client_config)
        .assert()
        .success();

    ctl(&config)
        .args(["mcp", "show", "omnistrate", "--client-config"])
        .arg(&client_config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("MCP server not found: omnistrate"));
}

#[test]
fn unknown_workflow_action_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    ctl(&dir.path().join("config.toml"))
        .args(["instance", "workflow", "instance-abc", "--action", "teleport"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown action type"));
}

#[test]
fn instance_list_requires_login() {
    let dir = TempDir::new().expect("tempdir");
    ctl(&dir.path().join("config.toml"))
        .args(["instance", "list"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not logged in"));
}

#[test]
fn instance_list_requires_service() {
    let dir = TempDir::new().expect("tempdir");
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "token = \"jwt\"\n").expect("write config");

    ctl(&config)
        .args(["instance", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("service ID required"));
}

#[test]
fn invalid_config_file_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "token = [unterminated").expect("write config");

    ctl(&config)
        .arg("logout")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid TOML"));
}

#[test]
fn logout_without_login() {
    let dir = TempDir::new().expect("tempdir");
    ctl(&dir.path().join("config.toml"))
        .arg("logout")
        .assert()
        .success()
        .stdout("Not logged in\n");
}
