//! Integration tests for the command-line front end

use std::path::PathBuf;
use std::process::Command;

const LEGACY_ESTIMATE: &str = r#"{
  "sheets": [{
    "name": "Смета",
    "data": [
      {"name": "Раздел 1", "_type": "header"},
      {"name": "Штукатурка", "unit": "м2", "quantity": 10, "price": 500, "markup": 20, "discount": 0},
      {"name": "Плитка", "unit": "м2", "quantity": "5", "price": "1000", "markup": 10, "discount": 5}
    ],
    "footer": [{"name": "ИТОГО", "is_grand_total": true}]
  }],
  "currentSheet": 0,
  "totals": {"grand_total": 1}
}"#;

fn temp_file(tag: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "smeta_cli_{}_{}_{:?}.json",
        tag,
        std::process::id(),
        std::thread::current().id(),
    ));
    std::fs::write(&path, content).expect("Failed to write temp estimate");
    path
}

fn run_command(args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .arg("run")
        .arg("-q")
        .arg("--")
        // Tests must not depend on a user's config file.
        .arg("--no-config")
        .args(args)
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

#[test]
fn test_report_output() {
    let path = temp_file("report", LEGACY_ESTIMATE);
    let (stdout, _, code) = run_command(&[path.to_str().unwrap()]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Раздел 1"));
    assert!(stdout.contains("6 000,00"));
    assert!(stdout.contains("5 225,00"));
    assert!(stdout.trim_end().ends_with("11 225,00"));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_json_summary() {
    let path = temp_file("json", LEGACY_ESTIMATE);
    let (stdout, _, code) = run_command(&["--json", path.to_str().unwrap()]);
    assert_eq!(code, 0);
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let grand = summary["grand_total"].as_f64().unwrap();
    assert!((grand - 11225.0).abs() < 1e-6);
    assert_eq!(summary["grand_total"], summary["client_grand_total"]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_output_writes_normalized_document() {
    let input = temp_file("in", LEGACY_ESTIMATE);
    let output = input.with_extension("out.json");
    let (_, _, code) = run_command(&[
        "--json",
        "-o",
        output.to_str().unwrap(),
        input.to_str().unwrap(),
    ]);
    assert_eq!(code, 0);

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let footer = &written["sheets"][0]["footer"]["items"][0];
    assert!((footer["grand_total"].as_f64().unwrap() - 11225.0).abs() < 1e-6);
    assert_eq!(written["sheets"][0]["data"][2]["quantity"], "5");
    assert!((written["totals"]["grand_total"].as_f64().unwrap() - 11225.0).abs() < 1e-6);
    let _ = std::fs::remove_file(&input);
    let _ = std::fs::remove_file(&output);
}

#[test]
fn test_missing_file_fails() {
    let (_, stderr, code) = run_command(&["/definitely/not/here.json"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("cannot load"));
}

#[test]
fn test_unknown_option() {
    let (_, stderr, code) = run_command(&["--frobnicate"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Unknown option"));
}
