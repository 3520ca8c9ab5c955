//! CLI integration tests

use std::process::{Command, Output};

fn memwatch(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_memwatch"))
        .args(args)
        .env("HOME", std::env::temp_dir())
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = memwatch(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("memwatch"), "Should show app name");
    for command in ["usage", "stats", "history", "gc", "start", "stop", "config"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
    assert!(stdout.contains("--api-url"), "Should show api-url option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = memwatch(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("memwatch"), "Should show binary name");
}

/// Test history subcommand help
#[test]
fn test_history_help() {
    let output = memwatch(&["history", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "History help should succeed");
    assert!(stdout.contains("--limit"), "Should show limit option");
}

/// Test gc subcommand help
#[test]
fn test_gc_help() {
    let output = memwatch(&["gc", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Gc help should succeed");
    assert!(stdout.contains("stats"), "Should show stats subcommand");
    assert!(stdout.contains("run"), "Should show run subcommand");
}

/// Test config command help
#[test]
fn test_config_help() {
    let output = memwatch(&["config", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Config help should succeed");
    assert!(stdout.contains("--interval-ms"), "Should show interval option");
    assert!(
        stdout.contains("--warning-threshold"),
        "Should show warning threshold option"
    );
    assert!(
        stdout.contains("--history-limit"),
        "Should show history limit option"
    );
}

/// Test that an invalid format value is rejected
#[test]
fn test_invalid_format() {
    let output = memwatch(&["--format", "yaml", "usage"]);

    assert!(!output.status.success(), "Invalid format should fail");
}

/// Test that a missing subcommand is rejected
#[test]
fn test_missing_subcommand() {
    let output = memwatch(&[]);

    assert!(!output.status.success(), "Missing subcommand should fail");
}

/// Test the usage command end to end against a mocked agent
#[test]
fn test_usage_json_against_mock_agent() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/memory/usage")
        .with_status(200)
        .with_body(
            r#"{"rss": 2048, "heap_total": 1024, "heap_used": 512, "external": 0,
                "heap_used_percent": 50.0, "timestamp": 1700000000000}"#,
        )
        .create();

    let output = memwatch(&["--api-url", &server.url(), "--format", "json", "usage"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Usage should succeed");
    let usage: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(usage["heap_used"], 512);
}

/// Test that agent errors surface as a failing exit status
#[test]
fn test_gc_run_unavailable() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/memory/gc")
        .with_status(503)
        .with_body(r#"{"success": false, "message": "memory reclamation is not available on this host"}"#)
        .create();

    let output = memwatch(&["--api-url", &server.url(), "gc", "run"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Unavailable reclamation should fail");
    assert!(stderr.contains("not available"));
}
