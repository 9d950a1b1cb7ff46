#![cfg(feature = "cli")]

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use markerfleet::tasks::read_records;
use markerfleet::MissionReport;
use predicates::prelude::*;

fn mission_json() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../testdata/mission.json")
}

fn markerfleet() -> Command {
    let mut cmd = Command::cargo_bin("markerfleet").expect("binary built");
    cmd.args(["--log-level", "off"]);
    cmd
}

#[test]
fn check_lists_the_fleet() {
    markerfleet()
        .arg("check")
        .arg("--config")
        .arg(mission_json())
        .assert()
        .success()
        .stdout(predicate::str::contains("scanner scout-1"))
        .stdout(predicate::str::contains("carrier rover-2"))
        .stdout(predicate::str::contains(
            "ok: 2 scanner(s), 2 carrier(s), 2 destination group(s)",
        ));
}

#[test]
fn run_writes_report_and_task_log() {
    let dir = tempfile::tempdir().expect("tempdir");
    let report_path = dir.path().join("report.json");
    let log_path = dir.path().join("tasks.jsonl");

    markerfleet()
        .arg("run")
        .arg("--config")
        .arg(mission_json())
        .arg("--report")
        .arg(&report_path)
        .arg("--tasks-log")
        .arg(&log_path)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "published 4 | delivered 4 | remaining 0 | failed agents 0",
        ));

    let report = MissionReport::load_json(&report_path).expect("report");
    assert!(report.carrier_wave_launched);
    assert_eq!(report.scanners.len(), 2);
    assert_eq!(report.delivered().count(), 4);
    assert!(report.finished_at >= report.started_at);

    assert_eq!(read_records(&log_path).expect("records").len(), 4);
}

#[test]
fn check_rejects_unknown_carrier_group() {
    let dir = tempfile::tempdir().expect("tempdir");
    let raw = fs::read_to_string(mission_json()).expect("read");
    let broken = raw.replace(r#""group": "2", "max_tasks""#, r#""group": "9", "max_tasks""#);
    assert_ne!(raw, broken);
    let path = dir.path().join("broken.json");
    fs::write(&path, broken).expect("write");

    markerfleet()
        .arg("check")
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("rover-2"));
}

#[test]
fn missing_config_fails() {
    markerfleet()
        .args(["run", "--config", "does-not-exist.json"])
        .assert()
        .failure();
}
