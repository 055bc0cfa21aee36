//! Integration tests for the chartkeep binary
//!
//! These cover the paths that fail or finish before a cluster connection
//! is needed.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn chartkeep(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chartkeep"))
        .args(args)
        .env_remove("CHARTKEEP_NAMESPACE")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute chartkeep")
}

/// Write a settings file and return its path as a string
fn settings_file(dir: &Path, content: &str) -> String {
    let path = dir.join("config.yaml");
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_help_lists_commands() {
    let output = chartkeep(&["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["assemble", "compose", "import", "artifacts", "delete"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_assemble_requires_repository_scope() {
    let output = chartkeep(&["assemble", "app"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_invalid_settings_file() {
    let dir = TempDir::new().unwrap();
    let config = settings_file(dir.path(), "assembleTimeout: whenever\n");

    let output = chartkeep(&["--config", &config, "compose", "base"]);
    assert_eq!(output.status.code(), Some(64));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid settings file"));
}

#[test]
fn test_assemble_missing_values_file() {
    let dir = TempDir::new().unwrap();
    let config = settings_file(dir.path(), "namespace: charts\n");
    let missing = dir.path().join("missing.yaml");

    let output = chartkeep(&[
        "--config",
        &config,
        "assemble",
        "app",
        "--repo",
        "stable",
        "-f",
        &missing.to_string_lossy(),
    ]);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn test_assemble_invalid_set_value() {
    let dir = TempDir::new().unwrap();
    let config = settings_file(dir.path(), "namespace: charts\n");

    let output = chartkeep(&["--config", &config, "assemble", "app", "--repo", "stable", "--set", "novalue"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn test_import_local_archive_with_chart_flag() {
    let dir = TempDir::new().unwrap();
    let config = settings_file(dir.path(), "namespace: charts\n");

    let output = chartkeep(&[
        "--config",
        &config,
        "import",
        "./app-1.0.0.tgz",
        "--chart",
        "app",
        "--repo",
        "stable",
    ]);
    assert_eq!(output.status.code(), Some(64));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--chart needs a repository URL"));
}

#[test]
fn test_import_missing_archive() {
    let dir = TempDir::new().unwrap();
    let config = settings_file(dir.path(), "namespace: charts\n");
    let missing = dir.path().join("app-1.0.0.tgz");

    let output = chartkeep(&["--config", &config, "import", &missing.to_string_lossy(), "--repo", "stable"]);
    assert_eq!(output.status.code(), Some(5));
}
