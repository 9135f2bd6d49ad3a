use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ANALYSIS: &str = r#"{"pageCount": 1, "isLargeDocument": false, "estimatedMemoryRequirement": 2097152,
    "containsScannedContent": false, "isTextHeavy": true, "hasComplexLayout": false, "containsGraphics": false}"#;

const SLIP_TEXT: &str = "Name: JOHN A DOE\\nPay slip for the month of September 2023\\nBasic Pay 136400\\nIncome Tax 36400\\nNet Pay 100000";

fn payslip(dir: &TempDir) -> Command {
    let config = dir.path().join("config.json");
    if !config.exists() {
        fs::write(&config, "{}").unwrap();
    }
    let mut cmd = Command::cargo_bin("payslip").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

fn write_request(dir: &Path, name: &str, analysis: &str) -> PathBuf {
    let path = dir.join(name);
    let body = format!(r#"{{"analysis": {}, "pages": [], "raw_text": "{}"}}"#, analysis, SLIP_TEXT);
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("payslip")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("batch"));
}

#[test]
fn process_prints_json_outcome() {
    let dir = TempDir::new().unwrap();
    let input = write_request(dir.path(), "slip.json", ANALYSIS);

    payslip(&dir)
        .arg("process")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""name": "JOHN A DOE""#))
        .stdout(predicate::str::contains(r#""state": "fallback_to_linear_text""#));
}

#[test]
fn process_csv_lists_line_items() {
    let dir = TempDir::new().unwrap();
    let input = write_request(dir.path(), "slip.json", ANALYSIS);

    payslip(&dir)
        .args(["process", "--format", "csv"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("side,label,amount,raw_amount,confidence"))
        .stdout(predicate::str::contains("credit,Basic Pay,136400"))
        .stdout(predicate::str::contains("debit,Income Tax,36400"));
}

#[test]
fn process_text_reports_balance() {
    let dir = TempDir::new().unwrap();
    let input = write_request(dir.path(), "slip.json", ANALYSIS);

    payslip(&dir)
        .args(["process", "--format", "text", "--show-confidence"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Period: September 2023"))
        .stdout(predicate::str::contains("Balance: OK (net_pay)"))
        .stdout(predicate::str::contains("Extraction confidence: 100.0%"));
}

#[test]
fn process_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let input = write_request(dir.path(), "slip.json", ANALYSIS);
    let output = dir.path().join("out.json");

    payslip(&dir)
        .arg("process")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Output written to"));

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains("\"basicPay\": \"136400\""));
}

#[test]
fn process_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    payslip(&dir)
        .arg("process")
        .arg(dir.path().join("nope.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn process_rejects_malformed_json() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bad.json");
    fs::write(&input, "{ not json").unwrap();

    payslip(&dir)
        .arg("process")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid element file"));
}

#[test]
fn process_rejects_zero_page_analysis() {
    let dir = TempDir::new().unwrap();
    let analysis = ANALYSIS.replace(r#""pageCount": 1"#, r#""pageCount": 0"#);
    let input = write_request(dir.path(), "empty.json", &analysis);

    payslip(&dir)
        .arg("process")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("zero pages"));
}

#[test]
fn text_command_matches_plain_text() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("slip.txt");
    fs::write(&input, SLIP_TEXT.replace("\\n", "\n")).unwrap();

    payslip(&dir)
        .arg("text")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("name: JOHN A DOE"))
        .stdout(predicate::str::contains("netPay: 100000"));
}

#[test]
fn analyze_rejects_non_pdf() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("fake.pdf");
    fs::write(&input, "definitely not a pdf").unwrap();

    payslip(&dir)
        .arg("analyze")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a readable PDF"));
}

#[test]
fn batch_writes_outputs_and_summary() {
    let dir = TempDir::new().unwrap();
    let inputs = dir.path().join("in");
    fs::create_dir_all(&inputs).unwrap();
    write_request(&inputs, "a.json", ANALYSIS);
    write_request(&inputs, "b.json", ANALYSIS);
    let out = dir.path().join("out");

    payslip(&dir)
        .arg("batch")
        .arg(format!("{}/*.json", inputs.display()))
        .arg("--output-dir")
        .arg(&out)
        .arg("--summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 2 files"));

    assert!(out.join("a.json").exists());
    assert!(out.join("b.json").exists());
    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert_eq!(summary.matches("success").count(), 2);
}

#[test]
fn config_init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("payslip.json");

    payslip(&dir)
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .success();
    assert!(fs::read_to_string(&path).unwrap().contains("expected_pcda_columns"));

    payslip(&dir)
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}
