//! CLI integration tests for KEY animation commands.
//!
//! These run the real binary against files written to a temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TEXT_KEY: &str = "\
section: header
flags 0
type 2
frames 40
fps 15
joints 3
section: markers
markers 1
10 501
section: keyframe nodes
nodes 1
node 0
mesh name m_hip
entries 2
0: 0 0 1 2 3 10 20 30
0 0 0 0 0 0
1: 20 0 2 2 3 30 20 30
0 0 0 0 0 0
";

fn write_sample(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("walk.key");
    std::fs::write(&path, TEXT_KEY).unwrap();
    path
}

#[test]
fn info_reports_header_fields() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir);

    Command::cargo_bin("grim-rs")
        .unwrap()
        .args(["key", "info"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Joints: 3"))
        .stdout(predicate::str::contains("Markers: 1"))
        .stdout(predicate::str::contains("Tracks: 1"));
}

#[test]
fn info_detailed_lists_tracks() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir);

    Command::cargo_bin("grim-rs")
        .unwrap()
        .args(["key", "info", "--detailed"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("m_hip"))
        .stdout(predicate::str::contains("frame 10 -> 501"));
}

#[test]
fn validate_accepts_well_formed_file() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir);

    Command::cargo_bin("grim-rs")
        .unwrap()
        .args(["key", "validate"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("structurally valid"));
}

#[test]
fn parse_failure_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.key");
    std::fs::write(&path, "section: nothing useful\n").unwrap();

    Command::cargo_bin("grim-rs")
        .unwrap()
        .args(["key", "info"])
        .arg(&path)
        .assert()
        .failure();
}

#[test]
fn convert_to_binary_roundtrips() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir);
    let converted = dir.path().join("walk_binary.key");

    Command::cargo_bin("grim-rs")
        .unwrap()
        .args(["key", "convert"])
        .arg(&path)
        .arg(&converted)
        .args(["--to", "binary"])
        .assert()
        .success();

    let bytes = std::fs::read(&converted).unwrap();
    assert_eq!(&bytes[0..4], b"FYEK");

    Command::cargo_bin("grim-rs")
        .unwrap()
        .args(["key", "info"])
        .arg(&converted)
        .assert()
        .success()
        .stdout(predicate::str::contains("Joints: 3"));
}
