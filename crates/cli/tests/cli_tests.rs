//! CLI integration tests

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const SNAPSHOT: &str = r#"{
    "by_shard": [{"name": "by_shard", "columns": ["IndexName", "ShardID", "sum"],
                  "rows": [["logs", 0, 30.0], ["logs", 1, 10.0], ["metrics", 0, 5.0]]}],
    "avg_across_shards": [{"name": "avg", "columns": ["avg"], "rows": [[15.0]]}],
    "shard_independent": [{"name": "independent", "columns": ["sum"], "rows": [[0.0]]}],
    "node_total": [{"name": "total", "columns": ["sum"], "rows": [[45.0]]}]
}"#;

const TEMPERATURE_BODY: &str = r#"[{
    "timestamp_millis": 1700000000000,
    "summary": {
        "dimension": "cpu",
        "mean_usage": 3.33,
        "total_usage": 45.0,
        "num_shards": 2,
        "zones": {
            "hot": [{"key": {"index_name": "logs", "shard_id": 0},
                     "zone": "hot", "dimension": "cpu", "temperature": 6.67}],
            "warm": [],
            "lukewarm": [],
            "cold": [{"key": {"index_name": "logs", "shard_id": 1},
                      "zone": "cold", "dimension": "cpu", "temperature": 2.22}]
        }
    }
}]"#;

/// Run heatctl with a clean home so no user config leaks in
fn heatctl(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_heatctl"))
        .args(args)
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("HEATCTL_AGENT_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = heatctl(home.path(), &["--help"]);

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("shard heat engine"), "Should show app name");
    assert!(stdout.contains("compute"), "Should show compute command");
    assert!(stdout.contains("node"), "Should show node command");
    assert!(stdout.contains("shards"), "Should show shards command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = heatctl(home.path(), &["--version"]);

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("heatctl"), "Should show binary name");
}

/// Test compute subcommand help
#[test]
fn test_compute_help() {
    let home = TempDir::new().unwrap();
    let output = heatctl(home.path(), &["compute", "--help"]);

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Compute help should succeed");
    assert!(stdout.contains("--snapshot"), "Should show snapshot option");
    assert!(stdout.contains("--dimension"), "Should show dimension option");
    assert!(stdout.contains("--threshold"), "Should show threshold option");
}

#[test]
fn test_compute_json_output() {
    let home = TempDir::new().unwrap();
    let snapshot = home.path().join("cpu.json");
    std::fs::write(&snapshot, SNAPSHOT).unwrap();

    let output = heatctl(
        home.path(),
        &[
            "--format",
            "json",
            "compute",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--dimension",
            "cpu",
        ],
    );

    assert!(output.status.success(), "Compute should succeed");
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["dimension"], "cpu");
    assert_eq!(summary["num_shards"], 3);
    assert_eq!(summary["zones"]["hot"][0]["key"]["index_name"], "logs");
    assert_eq!(summary["zones"]["hot"][0]["key"]["shard_id"], 0);
    assert_eq!(summary["zones"]["cold"].as_array().unwrap().len(), 2);
    assert!(summary["zones"]["warm"].as_array().unwrap().is_empty());
}

#[test]
fn test_compute_table_output() {
    let home = TempDir::new().unwrap();
    let snapshot = home.path().join("cpu.json");
    std::fs::write(&snapshot, SNAPSHOT).unwrap();

    let output = heatctl(
        home.path(),
        &["compute", "-s", snapshot.to_str().unwrap(), "-d", "cpu"],
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Compute should succeed");
    assert!(stdout.contains("Node temperature: cpu"));
    assert!(stdout.contains("metrics"));
    assert!(stdout.contains("6.67"));
}

#[test]
fn test_compute_rejects_malformed_snapshot() {
    let home = TempDir::new().unwrap();
    let snapshot = home.path().join("cpu.json");
    std::fs::write(
        &snapshot,
        SNAPSHOT.replace(r#"[["logs", 0, 30.0]"#, r#"[["logs", "zero", 30.0]"#),
    )
    .unwrap();

    let output = heatctl(
        home.path(),
        &["compute", "-s", snapshot.to_str().unwrap(), "-d", "cpu"],
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success(), "Malformed value should fail");
    assert!(stderr.contains("ShardID"), "Should name the bad column");
}

#[test]
fn test_compute_rejects_unknown_dimension() {
    let home = TempDir::new().unwrap();
    let output = heatctl(
        home.path(),
        &["compute", "-s", "missing.json", "-d", "gpu"],
    );
    assert!(!output.status.success());
}

#[test]
fn test_node_queries_agent() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/v1/temperature")
        .match_query(mockito::Matcher::UrlEncoded(
            "dimension".into(),
            "cpu".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TEMPERATURE_BODY)
        .create();

    let home = TempDir::new().unwrap();
    let output = heatctl(
        home.path(),
        &["--agent-url", &server.url(), "node", "--dimension", "cpu"],
    );

    mock.assert();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Node query should succeed");
    assert!(stdout.contains("Node Temperature"));
    assert!(stdout.contains("3.33"));
}

#[test]
fn test_shards_uses_config_file_agent_url() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/v1/shards")
        .match_query(mockito::Matcher::UrlEncoded("zone".into(), "hot".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[{"index_name": "logs", "shard_id": 0,
                 "temperature": {"cpu": 6.67}, "zones": {"cpu": "hot"}}]"#,
        )
        .create();

    let home = TempDir::new().unwrap();
    let config_dir = home.path().join(".config").join("heatctl");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.json"),
        format!(r#"{{"agent_url": "{}", "default_format": "json"}}"#, server.url()),
    )
    .unwrap();

    let output = heatctl(home.path(), &["shards", "--zone", "hot"]);

    mock.assert();
    assert!(output.status.success(), "Shards query should succeed");
    let shards: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shards[0]["index_name"], "logs");
    assert_eq!(shards[0]["zones"]["cpu"], "hot");
}

#[test]
fn test_agent_error_is_reported() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/api/v1/temperature")
        .match_query(mockito::Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error": "No temperature computed for cpu"}"#)
        .create();

    let home = TempDir::new().unwrap();
    let output = heatctl(
        home.path(),
        &["--agent-url", &server.url(), "node", "-d", "cpu"],
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("404"));
}
