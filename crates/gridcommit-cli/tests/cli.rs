use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("gridcommit-io/tests/data/three_node.dat")
}

fn gridcommit() -> Command {
    Command::cargo_bin("gridcommit").unwrap()
}

#[test]
fn validate_reports_counts() {
    gridcommit()
        .args(["validate", fixture().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "3 nodes, 3 generators, 2 lines, 48 hours over 2 day(s)",
        ))
        .stdout(predicate::str::contains("No warnings"));
}

#[test]
fn validate_missing_file_fails() {
    gridcommit()
        .args(["validate", "/nonexistent/model.dat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("validating /nonexistent/model.dat"));
}

#[test]
fn validate_rejects_broken_sets() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.dat");
    let content = fs::read_to_string(fixture()).unwrap();
    fs::write(&path, content.replacen("set td_nodes :=\nSUB ;", "set td_nodes :=\n;", 1)).unwrap();

    gridcommit()
        .args(["validate", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("appears in no role set"));
}

#[test]
fn inspect_table_and_dot() {
    let dir = tempdir().unwrap();
    let dot = dir.path().join("grid.dot");
    gridcommit()
        .args([
            "inspect",
            fixture().to_str().unwrap(),
            "--dot",
            dot.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("N_GAS"))
        .stdout(predicate::str::contains("thermal-with-demand"))
        .stdout(predicate::str::contains("fuels gas, slack, geothermal"))
        .stdout(predicate::str::contains("1 component(s)"));
    let rendered = fs::read_to_string(&dot).unwrap();
    assert!(rendered.starts_with("graph gridcommit {"));
    assert!(rendered.contains("label=\"LAKE\""));
}

#[test]
fn inspect_json() {
    let output = gridcommit()
        .args(["inspect", fixture().to_str().unwrap(), "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(report["lines"].as_array().unwrap().len(), 2);
    assert_eq!(report["params"]["horizon_hours"], 24);
}

#[test]
fn run_one_day_to_csv() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("log.csv");
    gridcommit()
        .args([
            "run",
            fixture().to_str().unwrap(),
            "--days",
            "1",
            "--format",
            "csv",
            "--verify",
            "-o",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Committed 1 day(s), 24 hours"));

    let content = fs::read_to_string(&out).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("day,hour,generator,on,start,output_mw,spin_mw,nonspin_mw")
    );
    assert_eq!(content.lines().count(), 24 * 3 + 1);
}

#[test]
fn run_with_config_file() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("log.json");
    let config = dir.path().join("run.toml");
    fs::write(
        &config,
        "backend = \"microlp\"\ntime_limit_seconds = 300\ncommit_hours = 12\n",
    )
    .unwrap();

    gridcommit()
        .args([
            "run",
            fixture().to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--days",
            "2",
            "--warm-start",
            "-o",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let log: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let days = log["days"].as_array().unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[1]["first_hour"], 13);
    assert_eq!(days[1]["last_hour"], 24);
}

#[test]
fn unknown_backend_is_rejected() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("log.json");
    gridcommit()
        .args([
            "run",
            fixture().to_str().unwrap(),
            "--backend",
            "cplex",
            "-o",
            out.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown MILP backend 'cplex'"));
    assert!(!out.exists());
}

#[test]
fn failed_run_still_writes_partial_log() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("partial.json");
    gridcommit()
        .args([
            "run",
            fixture().to_str().unwrap(),
            "--days",
            "3",
            "-o",
            out.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("run stopped after 2 committed day(s)"))
        .stderr(predicate::str::contains("SimDeratef"));

    let log: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(log["days"].as_array().unwrap().len(), 2);
}
