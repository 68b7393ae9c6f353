//! CLI tests for `mxcheck check` and `mxcheck list`.
//!
//! Spawns the mxcheck binary against DIMEX-formatted snapshot directories and
//! verifies exit codes and report contents.

use std::fs;
use std::process::Command;

use mxcheck::exit_codes;
use mxcheck::test_support::{SnapshotDir, dimex_section};

/// Three processes, two snapshots. Snapshot 2 has processes 0 and 1 both in
/// the critical section.
fn write_fixture(dir: &SnapshotDir) {
    let p0 = [
        dimex_section(1, 0, 2, 0, "[false false false]", 0, &[]),
        dimex_section(2, 2, 8, 5, "[false false false]", 2, &[]),
    ]
    .concat();
    let p1 = [
        dimex_section(1, 0, 2, 0, "[false false false]", 0, &[]),
        dimex_section(2, 2, 8, 6, "[false false false]", 2, &[]),
    ]
    .concat();
    let p2 = [
        dimex_section(1, 0, 2, 0, "[false false false]", 0, &[]),
        dimex_section(2, 0, 8, 1, "[false false false]", 0, &[]),
    ]
    .concat();
    dir.write_process(0, &p0).expect("write p0");
    dir.write_process(1, &p1).expect("write p1");
    dir.write_process(2, &p2).expect("write p2");
}

fn mxcheck(dir: &SnapshotDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mxcheck"));
    cmd.current_dir(dir.root());
    cmd
}

#[test]
fn check_reports_violations_and_exits_ok() {
    let dir = SnapshotDir::new().expect("snapshot dir");
    write_fixture(&dir);

    let output = mxcheck(&dir).arg("check").output().expect("mxcheck check");
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let report = fs::read_to_string(dir.root().join("snapshot_analysis.txt")).expect("report");
    let first = report.find("Snapshot 1:").expect("snapshot 1 block");
    let second = report.find("Snapshot 2:").expect("snapshot 2 block");
    assert!(first < second);
    assert_eq!(report.matches(" - Invariant 1: VIOLATED").count(), 1);
    assert_eq!(report.matches("VIOLATED").count(), 1);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(" - Invariant 1: VIOLATED"));
    assert!(stdout.contains("check: snapshots=2 violated=1 incomplete=0 dir=./snapshots"));
}

#[test]
fn fail_on_violation_changes_exit_code() {
    let dir = SnapshotDir::new().expect("snapshot dir");
    write_fixture(&dir);

    let status = mxcheck(&dir)
        .args(["check", "--fail-on-violation"])
        .status()
        .expect("mxcheck check");
    assert_eq!(status.code(), Some(exit_codes::VIOLATED));
}

#[test]
fn json_report_lists_every_invariant() {
    let dir = SnapshotDir::new().expect("snapshot dir");
    write_fixture(&dir);

    let status = mxcheck(&dir)
        .args(["check", "--format", "json", "--output", "report.json"])
        .status()
        .expect("mxcheck check");
    assert_eq!(status.code(), Some(exit_codes::OK));

    let raw = fs::read_to_string(dir.root().join("report.json")).expect("report");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
    let reports = value.as_array().expect("array");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1]["snapshot"], 2);
    assert_eq!(reports[1]["invariants"][0]["held"], false);
    assert_eq!(
        reports[1]["invariants"].as_array().map(Vec::len),
        Some(6)
    );
}

#[test]
fn missing_directory_exits_invalid() {
    let dir = SnapshotDir::new().expect("snapshot dir");

    let output = mxcheck(&dir)
        .args(["check", "--dir", "does-not-exist"])
        .output()
        .expect("mxcheck check");
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing snapshot directory"));
}

#[test]
fn failed_check_keeps_previous_report() {
    let dir = SnapshotDir::new().expect("snapshot dir");
    let report = dir.root().join("snapshot_analysis.txt");
    fs::write(&report, "PREVIOUS REPORT\n").expect("write report");
    dir.write_process(0, "Snapshot 1\nEstado: 0\n").expect("write p0");

    let output = mxcheck(&dir).arg("check").output().expect("mxcheck check");
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no `LogicalClock` line"));
    assert_eq!(fs::read_to_string(&report).expect("report"), "PREVIOUS REPORT\n");
}

#[test]
fn list_shows_incomplete_snapshots() {
    let dir = SnapshotDir::new().expect("snapshot dir");
    write_fixture(&dir);
    dir.write_process(3, &dimex_section(3, 0, 9, 0, "[false false false false]", 0, &[]))
        .expect("write p3");

    let output = mxcheck(&dir)
        .args(["list", "-n", "4"])
        .output()
        .expect("mxcheck list");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("snapshot 1: processes=[0, 1, 2] incomplete missing=[3]"));
    assert!(stdout.contains("snapshot 3: processes=[3] incomplete missing=[0, 1, 2]"));
}

#[test]
fn init_writes_default_config() {
    let dir = SnapshotDir::new().expect("snapshot dir");

    let status = mxcheck(&dir).arg("init").status().expect("mxcheck init");
    assert_eq!(status.code(), Some(exit_codes::OK));
    let contents = fs::read_to_string(dir.root().join("mxcheck.toml")).expect("config");
    assert!(contents.contains("process_count = 3"));
}
