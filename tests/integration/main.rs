//! Integration tests for the formgraph binary
//!
//! Each test writes node-set files into a temporary directory, runs the
//! binary on them and checks the JSON printed on stdout.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{Value, json};
use tempfile::TempDir;

const ROOT: &str = "c0ffee00-0000-4000-8000-000000000001";
const ANSWER: &str = "c0ffee00-0000-4000-8000-000000000002";
const FOLLOW_UP: &str = "c0ffee00-0000-4000-8000-000000000003";
const EXTRA: &str = "c0ffee00-0000-4000-8000-000000000004";

fn node_set() -> Value {
    json!({
        ROOT: {"name": "Form", "data_type": "none", "node_type": "branch"},
        ANSWER: {"parent_id": ROOT, "name": "Answer", "data_type": "text", "node_type": "leaf", "content": "yes", "y": 0},
        FOLLOW_UP: {"parent_id": ROOT, "name": "Follow up", "data_type": "text", "node_type": "leaf", "condition": "yes", "trigger": ANSWER, "y": 1},
    })
}

fn write(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
    path
}

fn run(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_formgraph"))
        .arg("--config")
        .arg(dir.path().join("formgraph.toml"))
        .args(args)
        .output()
        .expect("Failed to execute formgraph")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_formgraph"))
        .arg("--help")
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("form-node graphs"));
    assert!(stdout.contains("remove"));
}

#[test]
fn test_validate() {
    let dir = TempDir::new().unwrap();
    let nodes = write(&dir, "nodes.json", &node_set());
    let output = run(&dir, &["validate", arg(&nodes)]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output), json!({"nodes": 3, "active": 3}));
}

#[test]
fn test_validate_rejects_non_mapping() {
    let dir = TempDir::new().unwrap();
    let nodes = write(&dir, "nodes.json", &json!([1, 2, 3]));
    let output = run(&dir, &["validate", arg(&nodes)]);
    assert_eq!(output.status.code(), Some(2));
    let errors = stdout_json(&output);
    assert_eq!(errors[0]["error_type"], json!("param_error"));
    assert_eq!(errors[0]["message"], json!("Dictionary expected"));
}

#[test]
fn test_unload_active() {
    let dir = TempDir::new().unwrap();
    let nodes = write(&dir, "nodes.json", &node_set());
    let contents = write(&dir, "contents.json", &json!({ANSWER: "no"}));

    let output = run(&dir, &["content", arg(&nodes), arg(&contents)]);
    assert!(output.status.success());
    let unloaded = stdout_json(&output);
    assert_eq!(unloaded[FOLLOW_UP]["active"], json!(false));
    assert_eq!(unloaded[ANSWER]["content"], json!("no"));

    let output = run(&dir, &["unload", arg(&nodes), "--active"]);
    let active = stdout_json(&output);
    assert_eq!(active.as_object().unwrap().len(), 3);
}

#[test]
fn test_add_and_collision() {
    let dir = TempDir::new().unwrap();
    let nodes = write(&dir, "nodes.json", &node_set());
    let new_nodes = write(
        &dir,
        "new.json",
        &json!({EXTRA: {"parent_id": FOLLOW_UP, "name": "Extra", "data_type": "text", "node_type": "leaf"}}),
    );
    let output = run(&dir, &["add", arg(&nodes), arg(&new_nodes)]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)[EXTRA]["active"], json!(true));

    let again = write(&dir, "again.json", &json!({ROOT: {"name": "R", "data_type": "none", "node_type": "branch"}}));
    let output = run(&dir, &["add", arg(&nodes), arg(&again)]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_change() {
    let dir = TempDir::new().unwrap();
    let nodes = write(&dir, "nodes.json", &node_set());
    let changes = write(&dir, "changes.json", &json!({FOLLOW_UP: {"condition": "no", "view_type": "input"}}));
    let output = run(&dir, &["change", arg(&nodes), arg(&changes)]);
    assert!(output.status.success());
    let changed = stdout_json(&output);
    assert_eq!(changed.as_object().unwrap().len(), 1);
    assert_eq!(changed[FOLLOW_UP]["active"], json!(false));
    assert_eq!(changed[FOLLOW_UP]["view_type"], json!("input"));
}

#[test]
fn test_remove_branch() {
    let dir = TempDir::new().unwrap();
    let nodes = write(&dir, "nodes.json", &node_set());
    let output = run(&dir, &["remove", arg(&nodes), ANSWER, "--branches"]);
    assert!(output.status.success());
    let removal = stdout_json(&output);
    assert_eq!(removal["removed"], json!([ANSWER]));
    let changed = &removal["changed"][FOLLOW_UP];
    assert_eq!(changed["active"], json!(false));
    assert!(changed.get("trigger").is_none());
}

#[test]
fn test_remove_unknown_node() {
    let dir = TempDir::new().unwrap();
    let nodes = write(&dir, "nodes.json", &node_set());
    let output = run(&dir, &["remove", arg(&nodes), EXTRA]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout_json(&output)[0]["message"].as_str().unwrap().contains("does not exist"));
}

#[test]
fn test_config_attribute_rules() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("formgraph.toml"),
        "max_name_length = 4\n\n[[attributes]]\nname = \"view_type\"\nkind = \"text\"\n",
    )
    .unwrap();
    let nodes = write(&dir, "nodes.json", &node_set());
    let output = run(&dir, &["validate", arg(&nodes)]);
    assert_eq!(output.status.code(), Some(2));
    // "Answer" and "Follow up" exceed the limit
    assert_eq!(stdout_json(&output).as_array().unwrap().len(), 2);
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");
    let output = run(&dir, &["validate", arg(&missing)]);
    assert!(!output.status.success());
    assert_ne!(output.status.code(), Some(2));
}
