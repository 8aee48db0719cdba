use assert_cmd::prelude::*;
use serde_json::Value;
use std::process::Command;

fn ticketpilot(dir: &std::path::Path) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("ticketpilot");
    let mut cmd = Command::new(bin);
    cmd.current_dir(dir)
        .env_remove("EPLUS_EMAIL")
        .env_remove("EPLUS_PASSWORD")
        .env_remove("TICKETPILOT_EVENT_ID")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_every_flow() {
    let dir = tempfile::tempdir().unwrap();
    let assert = ticketpilot(dir.path()).arg("--help").assert().success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output");
    for command in ["first-come", "login", "lottery", "purchase", "config"] {
        assert!(stdout.contains(command), "missing {command} in help:\n{stdout}");
    }
}

#[test]
fn validate_reports_what_each_flow_still_needs() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("pilot.yaml");
    std::fs::write(&config, "target:\n  event_id: 0424600001-P0030270\n").unwrap();

    let assert = ticketpilot(dir.path())
        .args(["--config", config.to_str().unwrap(), "config", "validate"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output");
    assert!(stdout.contains("Configuration is valid"));
    assert!(stdout.contains("first-come  not ready"));
    assert!(stdout.contains("lottery     ready"));
}

#[test]
fn validate_rejects_a_zero_poll_interval() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("pilot.yaml");
    std::fs::write(&config, "timing:\n  poll_interval_ms: 0\n").unwrap();

    ticketpilot(dir.path())
        .args(["--config", config.to_str().unwrap(), "config", "validate"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn show_masks_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("pilot.yaml");
    std::fs::write(
        &config,
        "credentials:\n  email: someone@example.com\n  password: hunter2\n",
    )
    .unwrap();

    let assert = ticketpilot(dir.path())
        .args(["-o", "json", "--config", config.to_str().unwrap(), "config", "show"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output");
    assert!(!stdout.contains("hunter2"));
    assert!(!stdout.contains("someone@"));
    let value: Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(value["credentials"]["email"], "s***@example.com");
    assert_eq!(value["target"]["base_url"], "https://eplus.jp");
}

#[test]
fn first_come_without_event_id_fails_before_launching() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("pilot.yaml");
    std::fs::write(&config, "").unwrap();

    let assert = ticketpilot(dir.path())
        .args(["--config", config.to_str().unwrap(), "first-come"])
        .assert()
        .failure()
        .code(1);

    let stderr = String::from_utf8(assert.get_output().stderr.clone()).expect("utf8 output");
    assert!(stderr.contains("target.event_id"), "{stderr}");
}
