use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HISTORY: &str = r#"[
  {"timestamp": "2024-01-01T00:00:00.000Z", "download": 150.2, "upload": 12.4, "ping": 18, "jitter": 2.1},
  {"timestamp": "2024-01-01T00:05:00.000Z", "download": 148.0, "upload": 11.9, "ping": 19, "jitter": 1.8, "sinr5g": 12.5},
  {"timestamp": "2024-01-01T00:10:00.000Z", "download": null, "upload": 11.0, "ping": 20, "jitter": 2.0}
]"#;

/// Runs the binary inside `dir` with no ambient configuration leaking in.
fn speedtrack(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("speedtrack").unwrap();
    cmd.current_dir(dir)
        .env_remove("SPEEDTRACK_CONFIG")
        .env_remove("SPEEDTRACK_DB")
        .env_remove("SPEEDTRACK_LOG")
        .env_remove("SPEEDTRACK_INTERVAL_SECS")
        .env_remove("SPEEDTRACK_SIGNAL_URL")
        .env_remove("SPEEDTRACK_REPORT_OUT");
    cmd
}

#[test]
fn test_version_prints_package_version() {
    let dir = TempDir::new().unwrap();
    speedtrack(dir.path())
        .arg("version")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_init_writes_sample_config_once() {
    let dir = TempDir::new().unwrap();
    speedtrack(dir.path())
        .arg("init")
        .assert()
        .success()
        .stderr(contains("created speedtrack.yaml"));

    let written = fs::read_to_string(dir.path().join("speedtrack.yaml")).unwrap();
    assert!(written.contains("interval_secs: 300"));

    fs::write(dir.path().join("speedtrack.yaml"), "version: 1\n").unwrap();
    speedtrack(dir.path())
        .arg("init")
        .assert()
        .success()
        .stderr(contains("already exists"));
    assert_eq!(
        fs::read_to_string(dir.path().join("speedtrack.yaml")).unwrap(),
        "version: 1\n"
    );
}

#[test]
fn test_report_without_database_exits_no_data() {
    let dir = TempDir::new().unwrap();
    speedtrack(dir.path())
        .arg("report")
        .assert()
        .code(3)
        .stderr(contains("no data"));

    assert!(!dir.path().join("speedtest.db").exists());
    assert!(!dir.path().join("index.html").exists());
}

#[test]
fn test_import_then_report_writes_dashboard() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("results.json"), HISTORY).unwrap();

    speedtrack(dir.path())
        .args(["import", "results.json"])
        .assert()
        .success()
        .stdout(contains("Imported 2 of 3 records"));

    speedtrack(dir.path())
        .args(["report", "--out", "public/index.html"])
        .assert()
        .success()
        .stdout(contains("2 measurements"));

    let html = fs::read_to_string(dir.path().join("public/index.html")).unwrap();
    assert!(html.contains("2024-01-01T00:05:00.000Z"));
    assert!(html.contains("Latest 5G SINR"));
}

#[test]
fn test_repeat_import_is_idempotent() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("results.json"), HISTORY).unwrap();

    for expected in ["Imported 2 of 3", "Imported 0 of 3"] {
        speedtrack(dir.path())
            .args(["import", "results.json"])
            .assert()
            .success()
            .stdout(contains(expected));
    }
}

#[test]
fn test_import_rejects_non_array() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("results.json"), r#"{"rows": []}"#).unwrap();

    speedtrack(dir.path())
        .args(["import", "results.json"])
        .assert()
        .code(2)
        .stderr(contains("fatal"));
}

#[test]
fn test_status_reports_counts_and_bounds() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("history.json"), HISTORY).unwrap();

    speedtrack(dir.path())
        .args(["status"])
        .assert()
        .code(3)
        .stdout(contains("measurements: 0"));

    speedtrack(dir.path())
        .args(["import", "history.json", "--db", "data/speed.db"])
        .assert()
        .success();
    assert!(dir.path().join("data/speed.db").exists());

    let out = speedtrack(dir.path())
        .args(["status", "--db", "data/speed.db", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(doc["rows"], 2);
    assert_eq!(doc["first_at"], "2024-01-01T00:00:00.000Z");
    assert_eq!(doc["last_at"], "2024-01-01T00:05:00.000Z");
}

#[test]
fn test_db_from_config_file_and_env() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("results.json"), HISTORY).unwrap();
    fs::write(dir.path().join("speedtrack.yaml"), "version: 1\ndb: from-file.db\n").unwrap();

    speedtrack(dir.path())
        .args(["import", "results.json"])
        .assert()
        .success();
    assert!(dir.path().join("from-file.db").exists());

    speedtrack(dir.path())
        .env("SPEEDTRACK_DB", "from-env.db")
        .args(["import", "results.json"])
        .assert()
        .success();
    assert!(dir.path().join("from-env.db").exists());
}

#[test]
fn test_invalid_config_exits_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.yaml"), "version: 9\n").unwrap();

    speedtrack(dir.path())
        .args(["status", "--config", "bad.yaml"])
        .assert()
        .code(2)
        .stderr(contains("config error").and(contains("version")));
}

#[test]
fn test_zero_interval_is_rejected_before_launch() {
    let dir = TempDir::new().unwrap();
    speedtrack(dir.path())
        .args(["watch", "--interval-secs", "0"])
        .assert()
        .code(2)
        .stderr(contains("interval"));
    assert!(!dir.path().join("speedtest.db").exists());
}

#[test]
fn test_unknown_config_keys_are_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("c.yaml"),
        "version: 1\nfrobnicate: true\nreport:\n  colour: red\n",
    )
    .unwrap();

    speedtrack(dir.path())
        .args(["status", "--config", "c.yaml"])
        .assert()
        .code(3)
        .stderr(contains("frobnicate").and(contains("report.colour")));
}
