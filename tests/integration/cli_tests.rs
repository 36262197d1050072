//! CLI integration tests

mod common;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;
use tempfile::TempDir;

fn fixture_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/DeadClass", &plain_class("com/example/DeadClass"));
    write_class(dir.path(), "com/example/Used", &plain_class("com/example/Used"));
    write_class(
        dir.path(),
        "com/example/User",
        &ClassFileBuilder::new("com/example/User")
            .method_with_code("go", "()V", |pool| call_static(pool, "com/example/Used"))
            .build(),
    );
    dir
}

#[test]
fn test_reports_dead_classes() {
    let project = fixture_project();

    Command::cargo_bin("classreaper")
        .unwrap()
        .arg("--directory")
        .arg(project.path())
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("com.example.DeadClass"))
        .stdout(predicate::str::contains("com.example.Used").not());
}

#[test]
fn test_json_output() {
    let project = fixture_project();

    let output = Command::cargo_bin("classreaper")
        .unwrap()
        .arg("--directory")
        .arg(project.path())
        .arg("--format")
        .arg("json")
        .arg("--quiet")
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["candidate_count"], 3);
    assert!(report["unused"]
        .as_array()
        .unwrap()
        .iter()
        .any(|name| name == "com.example.DeadClass"));
}

#[test]
fn test_external_pattern_suppresses_reporting() {
    let project = fixture_project();

    Command::cargo_bin("classreaper")
        .unwrap()
        .arg("--directory")
        .arg(project.path())
        .arg("--external")
        .arg("com.example.DeadClass")
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("com.example.DeadClass").not());
}

#[test]
fn test_invalid_directory_fails() {
    Command::cargo_bin("classreaper")
        .unwrap()
        .arg("--directory")
        .arg("/definitely/not/a/real/path")
        .arg("--quiet")
        .assert()
        .failure();
}

#[test]
fn test_malformed_pattern_fails_at_setup() {
    let project = fixture_project();

    Command::cargo_bin("classreaper")
        .unwrap()
        .arg("--directory")
        .arg(project.path())
        .arg("--include")
        .arg("com.example.[")
        .arg("--quiet")
        .assert()
        .failure();
}
