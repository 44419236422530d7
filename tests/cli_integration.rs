//! CLI integration tests
//!
//! These run the built binary and check output formats and exit codes.

mod support;

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use support::{write, write_build_script, MISSING_ZLIB};
use tempfile::TempDir;

fn buildsieve_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_buildsieve"))
}

/// Runs the binary with a clean `BUILDSIEVE_*` environment
fn run(args: &[&str]) -> Output {
    let mut command = Command::new(buildsieve_bin());
    for (key, _) in std::env::vars_os() {
        if key.to_string_lossy().starts_with("BUILDSIEVE_") {
            command.env_remove(&key);
        }
    }
    command
        .args(args)
        .env("BUILDSIEVE_LOG_LEVEL", "warn")
        .output()
        .expect("Failed to execute buildsieve")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({}):\n{}",
            e,
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

#[test]
fn test_cli_help() {
    let output = run(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["detect", "build", "batch", "resolve"] {
        assert!(stdout.contains(command), "help is missing {}", command);
    }
}

#[test]
fn test_cli_version() {
    let output = run(&["--version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_detect_lists_strategies_in_priority_order() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Makefile", "all:\n");
    write(dir.path(), "src/CMakeLists.txt", "project(x)\n");

    let output = run(&["detect", path_str(dir.path()), "--format", "json"]);

    assert_eq!(output.status.code(), Some(0));
    let json = stdout_json(&output);
    let strategies: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["strategy"].as_str().unwrap())
        .collect();
    assert_eq!(strategies, vec!["cmake", "make"]);
    assert!(json[0]["build_root"].as_str().unwrap().ends_with("src"));
}

#[test]
fn test_detect_nothing_exits_two() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "README.md", "hello\n");

    let output = run(&["detect", path_str(dir.path())]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stdout).contains("No build system detected"));
}

#[test]
fn test_detect_missing_path_exits_one() {
    let dir = TempDir::new().unwrap();

    let output = run(&["detect", path_str(&dir.path().join("gone"))]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[test]
fn test_build_success() {
    let dir = TempDir::new().unwrap();
    write_build_script(dir.path(), "echo compiled");

    let output = run(&["build", path_str(dir.path()), "--advisor", "none", "-f", "json"]);

    assert_eq!(output.status.code(), Some(0));
    let json = stdout_json(&output);
    assert_eq!(json["strategy"], "custom-script");
    assert_eq!(json["status"], "success");
    assert_eq!(json["attempts"], 1);
}

#[test]
fn test_build_missing_header_exits_two() {
    let dir = TempDir::new().unwrap();
    write_build_script(dir.path(), MISSING_ZLIB);

    let output = run(&[
        "build",
        path_str(dir.path()),
        "--advisor",
        "none",
        "--max-attempts",
        "1",
        "--format",
        "json",
    ]);

    assert_eq!(output.status.code(), Some(2));
    let json = stdout_json(&output);
    assert_eq!(json["status"], "missing-dependency");
    assert_eq!(json["unresolved_symbols"], serde_json::json!(["zlib.h"]));
}

#[test]
fn test_build_rejects_invalid_attempts() {
    let dir = TempDir::new().unwrap();

    let output = run(&["build", path_str(dir.path()), "--max-attempts", "0"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Max attempts"));
}

#[test]
fn test_batch_writes_results_file() {
    let repos = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_build_script(&repos.path().join("alpha"), "echo ok");
    write(&repos.path().join("beta"), "notes.txt", "nothing here\n");
    let results = out.path().join("results.json");

    let output = run(&[
        "batch",
        path_str(repos.path()),
        "--jobs",
        "2",
        "--advisor",
        "none",
        "--no-progress",
        "--output",
        path_str(&results),
        "--format",
        "json",
    ]);

    assert_eq!(output.status.code(), Some(0));
    let summary = stdout_json(&output);
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["successes"], 1);
    assert_eq!(summary["undetectable"], 1);

    let written: Value = serde_json::from_str(&fs::read_to_string(&results).unwrap()).unwrap();
    let projects: Vec<&str> = written["reports"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["project"].as_str().unwrap())
        .collect();
    assert_eq!(projects, vec!["alpha", "beta"]);
    assert_eq!(written["cancelled"], false);
}

#[test]
fn test_batch_missing_required_tool_aborts() {
    let repos = TempDir::new().unwrap();
    write_build_script(&repos.path().join("alpha"), "touch ran");

    let output = Command::new(buildsieve_bin())
        .args(["batch", path_str(repos.path()), "--no-progress", "--advisor", "none"])
        .env("BUILDSIEVE_REQUIRED_TOOLS", "definitely-not-a-real-tool-xyz")
        .output()
        .expect("Failed to execute buildsieve");

    assert_eq!(output.status.code(), Some(1));
    assert!(!repos.path().join("alpha/ran").exists());
}

#[test]
fn test_resolve_without_guess() {
    let output = run(&["resolve", "bad_name.h", "--format", "json"]);

    assert_eq!(output.status.code(), Some(0));
    let json = stdout_json(&output);
    assert_eq!(json["entries"][0]["package"], Value::Null);
    assert_eq!(json["entries"][0]["resolvable"], false);
    assert_eq!(json["resolved"], 0);
}
