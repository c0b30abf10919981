//! Command-line tests against the shipped flow configuration

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;

const CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../configs/flows.yaml");

fn waypointctl() -> Command {
    let mut cmd = Command::cargo_bin("waypointctl").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("WAYPOINT_CONFIG")
        .env_remove("SERPER_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(CONFIG);
    cmd
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_validate_config() {
    waypointctl()
        .arg("validate-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("✅ Configuration is valid"))
        .stdout(predicate::str::contains("Chains Compiled"))
        .stdout(predicate::str::contains("missing"));
}

#[test]
fn test_missing_config_fails() {
    Command::cargo_bin("waypointctl")
        .unwrap()
        .env("NO_COLOR", "1")
        .args(["--config", "does/not/exist.yaml", "validate-config"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Configuration validation failed"))
        .stderr(predicate::str::contains("does/not/exist.yaml"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flows.yaml");
    std::fs::write(
        &path,
        "flows:\n  - id: math\n    nodes:\n      - name: math\n        type: AbacusNode\n",
    )
    .unwrap();

    Command::cargo_bin("waypointctl")
        .unwrap()
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg(&path)
        .arg("validate-config")
        .assert()
        .failure();
}

#[test]
fn test_list_flows() {
    waypointctl()
        .arg("list-flows")
        .assert()
        .success()
        .stdout(predicate::str::contains("Search Flow"))
        .stdout(predicate::str::contains("Math Flow"))
        .stdout(predicate::str::contains("math → output"))
        .stdout(predicate::str::contains("Default flow:"));
}

// ============================================================================
// Run
// ============================================================================

#[test]
fn test_run_math_text() {
    waypointctl()
        .args(["run", "calculate 15 + 25"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Processing:"))
        .stdout(predicate::str::contains("(Flow: math)"))
        .stdout(predicate::str::contains("Result: 40.0"));
}

#[test]
fn test_run_verbose_shows_tables() {
    waypointctl()
        .args(["run", "divide 100 by 4", "--verbose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total Execution Time"))
        .stdout(predicate::str::contains("✅ Success"));
}

#[test]
fn test_run_json_envelope() {
    let output = waypointctl()
        .args(["run", "6 * 7", "--flow", "math", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["success"], true);
    assert_eq!(envelope["flow_used"], "math");
    assert!(envelope["output"].as_str().unwrap().contains("Result: 42.0"));
    assert_eq!(envelope["routing"]["reason"]["by"], "explicit");
    assert!(envelope["node_results"]["math"]["success"].as_bool().unwrap());
}

#[test]
fn test_run_failure_exits_nonzero() {
    waypointctl()
        .args(["run", "10 / 0", "--flow", "math"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("❌ Error"))
        .stdout(predicate::str::contains("Division by zero"));
}

#[test]
fn test_run_unknown_flow() {
    waypointctl()
        .args(["run", "hello", "--flow", "weather"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Unknown flow type: weather"));
}

#[test]
fn test_run_search_without_key() {
    waypointctl()
        .args(["run", "search for rust tutorials"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("SERPER_API_KEY"));
}

// ============================================================================
// Interactive, test and visualize
// ============================================================================

#[test]
fn test_interactive_session() {
    waypointctl()
        .arg("interactive")
        .write_stdin("help\ncalculate 2 + 3\nflow:math 6 * 7\nquit\ncalculate 1 + 1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("flow:<type> <text>"))
        .stdout(predicate::str::contains("Result: 5.0"))
        .stdout(predicate::str::contains("Result: 42.0"))
        .stdout(predicate::str::contains("Result: 2.0").not())
        .stdout(predicate::str::contains("Goodbye!"));
}

#[test]
fn test_interactive_ends_at_eof() {
    waypointctl()
        .arg("interactive")
        .write_stdin("calculate 2 * 4\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Result: 8.0"))
        .stdout(predicate::str::contains("Goodbye!"));
}

#[test]
fn test_selftest_math() {
    waypointctl()
        .args(["test", "--flow", "math"])
        .assert()
        .success()
        .stdout(predicate::str::contains("📝 Input: calculate 15 + 25"))
        .stdout(predicate::str::contains("Output preview:"))
        .stdout(predicate::str::contains("Passed: 2/2"));
}

#[test]
fn test_selftest_unknown_flow() {
    waypointctl()
        .args(["test", "--flow", "weather"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown flow: weather"));
}

#[test]
fn test_visualize_dot_stdout() {
    waypointctl()
        .args(["visualize", "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("digraph search {"))
        .stdout(predicate::str::contains("\"llm\" -> \"output\";"));
}

#[test]
fn test_visualize_writes_files() {
    let dir = tempfile::tempdir().unwrap();

    waypointctl()
        .args(["visualize", "--output"])
        .arg(dir.path())
        .assert()
        .success();

    for flow in ["search", "math", "llm"] {
        let path = dir.path().join(format!("{}_flow.txt", flow));
        let diagram = std::fs::read_to_string(path).unwrap();
        assert!(diagram.ends_with("● END"));
    }
}

#[test]
fn test_visualize_unknown_format() {
    waypointctl()
        .args(["visualize", "--format", "png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported diagram format: png"));
}
