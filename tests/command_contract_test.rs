use allure_lifecycle::model::{Status, TestResult};
use allure_lifecycle::report::{FileSystemResultsWriter, ResultsWriter};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn get_binary() -> String {
    env!("CARGO_BIN_EXE_allure-lifecycle").to_string()
}

fn write_results(dir: &Path, results: &[(&str, &str, Status)]) {
    let writer = FileSystemResultsWriter::new(dir);
    for (uuid, name, status) in results {
        let mut result = TestResult::new(*uuid).with_name(*name);
        result.status = Some(*status);
        writer.write_test_result(&result).unwrap();
    }
}

#[test]
fn test_list_json_output() {
    let dir = TempDir::new().unwrap();
    write_results(
        dir.path(),
        &[("u1", "login", Status::Passed), ("u2", "logout", Status::Failed)],
    );

    let output = Command::new(get_binary())
        .args(["list", dir.path().to_str().unwrap(), "--format", "json"])
        .output()
        .expect("Failed to execute list command");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("Invalid JSON output");
    let tests = json.as_array().unwrap();
    assert_eq!(tests.len(), 2);
    assert!(tests.iter().any(|t| t["uuid"] == "u2" && t["status"] == "failed"));
}

#[test]
fn test_list_text_output() {
    let dir = TempDir::new().unwrap();
    write_results(dir.path(), &[("u1", "login", Status::Passed)]);

    let output = Command::new(get_binary())
        .args(["list", dir.path().to_str().unwrap()])
        .output()
        .expect("Failed to execute list command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next().unwrap();
    assert!(line.starts_with("passed"));
    assert!(line.contains("login"));
    assert!(line.ends_with("u1"));
}

#[test]
fn test_summary_exit_code_reflects_failures() {
    let passing = TempDir::new().unwrap();
    write_results(passing.path(), &[("u1", "ok", Status::Passed)]);
    let failing = TempDir::new().unwrap();
    write_results(
        failing.path(),
        &[("u1", "ok", Status::Passed), ("u2", "bad", Status::Broken)],
    );

    let ok = Command::new(get_binary())
        .args(["summary", passing.path().to_str().unwrap()])
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute summary command");
    assert!(ok.status.success());
    assert!(String::from_utf8_lossy(&ok.stdout).contains("total"));

    let bad = Command::new(get_binary())
        .args(["summary", failing.path().to_str().unwrap()])
        .output()
        .expect("Failed to execute summary command");
    assert!(!bad.status.success());
}

#[test]
fn test_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(get_binary())
        .args(["list", dir.path().join("nope").to_str().unwrap()])
        .output()
        .expect("Failed to execute list command");
    assert!(!output.status.success());
}

#[test]
fn test_init_config_writes_parsable_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("allure.toml");
    let output = Command::new(get_binary())
        .arg("--init-config")
        .arg(&path)
        .output()
        .expect("Failed to execute init-config");
    assert!(output.status.success());

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(allure_lifecycle::config::Config::parse(&content).is_ok());
}

#[test]
fn test_completion_output() {
    let output = Command::new(get_binary())
        .args(["--completion", "bash"])
        .output()
        .expect("Failed to execute completion");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("allure-lifecycle"));
}
