//! Smoke tests for the mapgrab CLI
//!
//! These run the built binary against the scene fixture in `tests/fixtures`.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Get a command for the mapgrab binary
fn mapgrab() -> Command {
    Command::cargo_bin("mapgrab").expect("mapgrab binary should exist")
}

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/scene.json")
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    mapgrab()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.3.0"));
}

#[test]
fn test_help_flag() {
    mapgrab()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("parse"))
        .stdout(predicate::str::contains("query"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_no_args_shows_help() {
    mapgrab().assert().failure();
}

#[test]
fn test_query_subcommand_help() {
    mapgrab()
        .args(["query", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--include-hidden"))
        .stdout(predicate::str::contains("--merge"));
}

// ============================================================================
// Parse Tests
// ============================================================================

#[test]
fn test_parse_text() {
    mapgrab()
        .args(["--color", "never", "parse", "map[id=city] layer[type=circle]"])
        .assert()
        .success()
        .stdout(predicate::str::contains("map    id = city"))
        .stdout(predicate::str::contains("layer  type = circle"));
}

#[test]
fn test_parse_json() {
    let output = mapgrab()
        .args(["--format", "json", "parse", r#"layer[id=stops] filter["has", "name"]"#])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["layerMatch"]["id"]["values"][0], "stops");
    assert_eq!(value["filterExpression"][0], "has");
}

#[test]
fn test_parse_error() {
    mapgrab()
        .args(["parse", "layer[id=stops"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

// ============================================================================
// Query Tests
// ============================================================================

#[test]
fn test_query_visible_stops() {
    mapgrab()
        .args(["--color", "never", "query", "layer[id=stops]", "--scene"])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("stops/1"))
        .stdout(predicate::str::contains("stops/3"))
        .stdout(predicate::str::contains("stops/4").not());
}

#[test]
fn test_query_include_hidden() {
    mapgrab()
        .args(["--color", "never", "query", "layer[id=stops]", "--include-hidden", "--scene"])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("stops/4"))
        .stdout(predicate::str::contains("hidden"));
}

#[test]
fn test_query_json_filter() {
    let output = mapgrab()
        .args([
            "--format",
            "json",
            "query",
            r#"map[id=city] layer[id=stops] filter["==", ["get", "line"], "blue"]"#,
            "--scene",
        ])
        .arg(fixture())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let items = value.as_array().unwrap();
    assert_eq!(items.len(), 1);
}

#[test]
fn test_query_merge_by_property() {
    mapgrab()
        .args(["--color", "never", "query", "layer[id=stops]", "--merge=line", "--scene"])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("merged of 2 features"));
}

#[test]
fn test_query_nth_from_end() {
    mapgrab()
        .args(["--color", "never", "query", "layer[id=stops]", "--nth=-1", "--scene"])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("0: stops/3"))
        .stdout(predicate::str::contains("stops/1").not());
}

#[test]
fn test_query_unknown_layer() {
    mapgrab()
        .args(["query", "layer[id=doesnotexist]", "--scene"])
        .arg(fixture())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("doesnotexist"));
}

#[test]
fn test_query_missing_scene() {
    let temp = TempDir::new().expect("create temp dir");
    mapgrab()
        .args(["query", "layer[id=stops]", "--scene"])
        .arg(temp.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn test_query_invalid_scene() {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().join("scene.json");
    fs::write(&path, "{ \"maps\": [1, 2] }").expect("write scene");
    mapgrab()
        .args(["query", "layer[id=stops]", "--scene"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_quiet_suppresses_text() {
    mapgrab()
        .args(["-q", "query", "layer[id=stops]", "--scene"])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// ============================================================================
// Inspect Tests
// ============================================================================

#[test]
fn test_inspect_center() {
    mapgrab()
        .args(["--color", "never", "inspect", "--map", "city", "200", "150", "--scene"])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("stops/2"));
}

#[test]
fn test_inspect_empty_corner() {
    mapgrab()
        .args(["--color", "never", "inspect", "--map", "city", "2", "2", "--scene"])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("no features"));
}

#[test]
fn test_inspect_unknown_map() {
    mapgrab()
        .args(["inspect", "--map", "nowhere", "10", "10", "--scene"])
        .arg(fixture())
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere"));
}
