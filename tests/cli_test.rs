//! Command-line runs of the `lambdamap` binary against inventory files.

mod common;

use assert_cmd::Command;
use common::{build_zip, create_test_file, function_arn, queue_arn};
use indoc::formatdoc;
use tempfile::TempDir;

fn lambdamap() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_lambdamap"));
    cmd.env_remove("LAMBDAMAP_INVENTORY").env("NO_COLOR", "1");
    cmd
}

fn fleet_inventory(dir: &TempDir) -> std::path::PathBuf {
    let package = build_zip(&[(
        "index.js",
        br#"await client.send(new InvokeCommand({ FunctionName: "worker" }));"#,
    )]);
    create_test_file(dir, "packages/api.zip", &package);

    let inventory = formatdoc! {r#"
        {{
          "Identity": {{"Account": "123456789012", "Arn": "arn:aws:iam::123456789012:user/ops", "Region": "us-east-1"}},
          "Functions": [
            {{"FunctionName": "api", "FunctionArn": "{api}", "CodeLocation": "packages/api.zip"}},
            {{"FunctionName": "worker", "FunctionArn": "{worker}"}}
          ],
          "EventSourceMappings": [
            {{"UUID": "m1", "EventSourceArn": "{jobs}", "FunctionArn": "{worker}"}}
          ]
        }}
    "#,
        api = function_arn("api"),
        worker = function_arn("worker"),
        jobs = queue_arn("jobs"),
    };
    create_test_file(dir, "inventory.json", inventory.as_bytes())
}

#[test]
fn test_discover_writes_json_report() {
    let dir = TempDir::new().unwrap();
    let inventory = fleet_inventory(&dir);
    let output = dir.path().join("out/report.json");

    lambdamap()
        .current_dir(dir.path())
        .arg("discover")
        .arg("--inventory")
        .arg(&inventory)
        .args(["--format", "json", "--page-size", "1", "--output"])
        .arg(&output)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let edges = report["graph"]["edges"].as_array().unwrap();
    assert!(edges.iter().any(|e| e["source"] == function_arn("api").as_str()
        && e["target"] == function_arn("worker").as_str()
        && e["type"] == "invokes"));
    assert!(edges.iter().any(|e| e["source"] == queue_arn("jobs").as_str()
        && e["type"] == "eventSource"));
    assert_eq!(report["layout"]["layer_count"], 2);
    assert!(report["warnings"].as_array().unwrap().is_empty());
}

#[test]
fn test_discover_dot_to_stdout() {
    let dir = TempDir::new().unwrap();
    let inventory = fleet_inventory(&dir);

    let assert = lambdamap()
        .current_dir(dir.path())
        .args(["discover", "--format", "dot", "--no-code-analysis", "--inventory"])
        .arg(&inventory)
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.starts_with("digraph topology {"));
    assert!(!stdout.contains("invokes"));
}

#[test]
fn test_empty_fleet_exits_nonzero_with_report() {
    let dir = TempDir::new().unwrap();
    let inventory = create_test_file(
        &dir,
        "empty.json",
        br#"{"Identity": {"Account": "1", "Arn": "arn:aws:iam::1:user/x", "Region": "eu-west-1"}, "Functions": []}"#,
    );
    let output = dir.path().join("report.json");

    lambdamap()
        .current_dir(dir.path())
        .args(["discover", "--format", "json", "--inventory"])
        .arg(&inventory)
        .arg("--output")
        .arg(&output)
        .assert()
        .code(1);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(report["fatal_error"], "No functions found in region eu-west-1");
}

#[test]
fn test_missing_inventory_fails() {
    let dir = TempDir::new().unwrap();
    lambdamap()
        .current_dir(dir.path())
        .args(["discover", "--inventory", "does-not-exist.json"])
        .assert()
        .failure();
}

#[test]
fn test_init_creates_config_once() {
    let dir = TempDir::new().unwrap();

    lambdamap().current_dir(dir.path()).arg("init").assert().success();
    assert!(dir.path().join(".lambdamap.toml").exists());

    lambdamap().current_dir(dir.path()).arg("init").assert().failure();
    lambdamap()
        .current_dir(dir.path())
        .args(["init", "--force"])
        .assert()
        .success();
}
