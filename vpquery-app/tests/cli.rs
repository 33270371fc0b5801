use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// 在没有配置文件的临时目录中运行，避免读取仓库内的配置。
fn vpquery(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vpquery").expect("binary is built");
    cmd.current_dir(dir.path())
        .env_remove("VPQUERY_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.arg("--json").output().expect("run vpquery");
    assert!(output.status.success(), "{output:?}");
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn handles(result: &Value) -> Vec<String> {
    result["handles"]
        .as_array()
        .expect("handles array")
        .iter()
        .map(|handle| handle.as_str().expect("hex string").to_string())
        .collect()
}

#[test]
fn demo_run_queries_every_viewport_and_the_block() {
    let dir = TempDir::new().expect("temp dir");
    let report = json_output(&mut vpquery(&dir));

    let results = report["results"].as_array().expect("results array");
    assert_eq!(results.len(), 4);
    assert_eq!(results[0]["command"], "query_viewport");
    assert_eq!(results[0]["target"], "109");
    assert_eq!(handles(&results[0]), ["100", "101", "102", "103", "104", "105", "106"]);
    assert_eq!(handles(&results[1]), ["104", "105", "106"]);
    assert!(handles(&results[2]).is_empty());
    assert_eq!(results[3]["command"], "query_block");
    assert_eq!(handles(&results[3]), ["105", "106"]);
}

#[test]
fn kind_filter_and_negative_tolerance() {
    let dir = TempDir::new().expect("temp dir");
    let report = json_output(
        vpquery(&dir).args(["--viewport", "0x10A", "--tolerance=-50", "--kind", "text"]),
    );

    assert_eq!(report["tolerance"], -50.0);
    let results = report["results"].as_array().expect("results array");
    assert_eq!(results.len(), 1);
    assert_eq!(handles(&results[0]), ["106"]);
    assert_eq!(results[0]["entities"][0], "106 TEXT");
}

#[test]
fn text_report_lists_entities() {
    let dir = TempDir::new().expect("temp dir");
    vpquery(&dir)
        .args(["--block", "104"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[query_block 104]"))
        .stdout(predicate::str::contains("105 CIRCLE"))
        .stdout(predicate::str::contains("106 TEXT"));
}

#[test]
fn config_file_supplies_defaults() {
    let dir = TempDir::new().expect("temp dir");
    fs::create_dir(dir.path().join("config")).expect("config dir");
    fs::write(
        dir.path().join("config").join("default.toml"),
        "[logging]\nlevel = \"warn\"\n\n[query]\nentity_kinds = [\"CIRCLE\"]\n",
    )
    .expect("write config");

    let report = json_output(vpquery(&dir).args(["--viewport", "109"]));
    assert_eq!(report["kinds"][0], "CIRCLE");
    assert_eq!(handles(&report["results"][0]), ["102", "105"]);
}

#[test]
fn unknown_kind_fails() {
    let dir = TempDir::new().expect("temp dir");
    vpquery(&dir)
        .args(["--kind", "HATCH"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HATCH"));
}

#[test]
fn querying_a_non_block_fails() {
    let dir = TempDir::new().expect("temp dir");
    vpquery(&dir)
        .args(["--block", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("query_block"));
}

#[test]
fn viewport_and_block_are_exclusive() {
    let dir = TempDir::new().expect("temp dir");
    vpquery(&dir)
        .args(["--viewport", "109", "--block", "104"])
        .assert()
        .failure();
}
