//! End-to-end tests for the `asyncfix` binary.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SERVICE: &str = "\
namespace Demo;

public class Service
{
    public async Task<int> Compute()
    {
        return 42;
    }

    public async Task Ping()
    {
    }
}
";

const BUILD_LOG: &str = "\
Build started.
  3>src/Service.cs(10,23): warning CS1998: This async method lacks 'await' operators and will run synchronously. [/repo/Demo.csproj]
  3>src/Service.cs(5,28): warning CS1998: This async method lacks 'await' operators and will run synchronously. [/repo/Demo.csproj]
  3>src/Service.cs(5,28): warning CS1998: This async method lacks 'await' operators and will run synchronously. [/repo/Demo.csproj]
  3>src/Other.cs(1,1): warning CS0168: The variable 'e' is declared but never used [/repo/Demo.csproj]
Build succeeded.
";

fn asyncfix() -> Command {
    Command::cargo_bin("asyncfix").expect("asyncfix binary")
}

fn create_temp_repo() -> TempDir {
    let td = tempfile::tempdir().expect("tempdir");
    let root = td.path();
    fs::create_dir_all(root.join("src")).expect("mkdir");
    fs::write(root.join("src").join("Service.cs"), SERVICE).expect("write source");
    fs::write(root.join("build.log"), BUILD_LOG).expect("write log");
    td
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).expect("read")
}

fn run_json(root: &Path) -> serde_json::Value {
    let text = read(root, "artifacts/asyncfix/run.json");
    serde_json::from_str(&text).expect("run.json")
}

#[test]
fn test_help_lists_commands() {
    asyncfix()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fix"))
        .stdout(predicate::str::contains("locations"));
}

#[test]
fn test_fix_without_inputs_fails() {
    let temp = create_temp_repo();

    asyncfix()
        .current_dir(temp.path())
        .arg("fix")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nothing to fix"));
}

#[test]
fn test_fix_is_dry_run_by_default() {
    let temp = create_temp_repo();

    asyncfix()
        .current_dir(temp.path())
        .args(["fix", "--log", "build.log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 fixed"))
        .stdout(predicate::str::contains("would change (dry run)"));

    assert_eq!(read(temp.path(), "src/Service.cs"), SERVICE);

    let patch = read(temp.path(), "artifacts/asyncfix/patch.diff");
    assert!(patch.contains("+        return Task.FromResult(42);"));
    assert!(read(temp.path(), "artifacts/asyncfix/run.md").contains("(dry run)"));

    let run = run_json(temp.path());
    assert_eq!(run["schema"], "asyncfix.run.v1");
    assert_eq!(run["applied"], false);
    assert_eq!(run["summary"]["locations"], 2);
}

#[test]
fn test_fix_apply_writes_files() {
    let temp = create_temp_repo();

    asyncfix()
        .current_dir(temp.path())
        .args(["fix", "--log", "*.log", "--apply"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 file(s) written"));

    let text = read(temp.path(), "src/Service.cs");
    assert!(text.contains("    public Task<int> Compute()\n"));
    assert!(text.contains("        return Task.FromResult(42);\n"));
    assert!(text.contains("        return Task.CompletedTask;\n"));

    let run = run_json(temp.path());
    assert_eq!(run["applied"], true);
    assert_eq!(run["summary"]["fixed"], 2);
    assert_eq!(run["results"][0]["line"], 10);
    assert_eq!(run["results"][1]["line"], 5);

    // A second run over the same log is a no-op.
    asyncfix()
        .current_dir(temp.path())
        .args(["fix", "--log", "build.log", "--apply"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 already fixed"));
    assert_eq!(read(temp.path(), "src/Service.cs"), text);
}

#[test]
fn test_explicit_location_and_custom_out_dir() {
    let temp = create_temp_repo();

    asyncfix()
        .current_dir(temp.path())
        .args([
            "fix",
            "--location",
            "src/Service.cs:5",
            "--out-dir",
            "out",
            "--apply",
            "--backup",
        ])
        .assert()
        .success();

    assert!(temp.path().join("out").join("run.json").exists());
    assert_eq!(read(temp.path(), "src/Service.cs.asyncfix.bak"), SERVICE);
    assert!(read(temp.path(), "src/Service.cs").contains("public async Task Ping()"));
}

#[test]
fn test_malformed_location_argument_is_an_error() {
    let temp = create_temp_repo();

    asyncfix()
        .current_dir(temp.path())
        .args(["fix", "--location", "src/Service.cs"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("PATH:LINE"));
}

#[test]
fn test_fatal_location_exits_with_2() {
    let temp = create_temp_repo();
    let broken = "class C\n{\n    async Task A()\n    {\n        var s = @\"open;\n";
    fs::write(temp.path().join("src").join("Broken.cs"), broken).expect("write");

    asyncfix()
        .current_dir(temp.path())
        .args(["fix", "--location", "src/Broken.cs:3", "--apply"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("1 fatal"));

    assert_eq!(read(temp.path(), "src/Broken.cs"), broken);
    let run = run_json(temp.path());
    assert_eq!(run["results"][0]["status"], "fatal");
    assert_eq!(run["results"][0]["error_token"], "malformed_input");
}

#[test]
fn test_config_file_selects_suppress_mode() {
    let temp = create_temp_repo();
    fs::write(
        temp.path().join("asyncfix.toml"),
        "[fix]\nmode = \"suppress\"\n",
    )
    .expect("write config");

    asyncfix()
        .current_dir(temp.path())
        .args(["fix", "--location", "src/Service.cs:5", "--apply"])
        .assert()
        .success();

    let text = read(temp.path(), "src/Service.cs");
    assert!(text.contains("#pragma warning disable CS1998"));
    assert!(text.contains("public async Task<int> Compute()"));

    // The command line wins over the file. The pragma pair moved Ping down to line 12.
    asyncfix()
        .current_dir(temp.path())
        .args(["fix", "--location", "src/Service.cs:12", "--mode", "rewrite", "--apply"])
        .assert()
        .success();
    assert!(read(temp.path(), "src/Service.cs").contains("public Task Ping()"));
}

#[test]
fn test_invalid_config_is_an_error() {
    let temp = create_temp_repo();
    fs::write(temp.path().join("asyncfix.toml"), "[fix]\nmode = \"delete\"\n")
        .expect("write config");

    asyncfix()
        .current_dir(temp.path())
        .args(["fix", "--log", "build.log"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("asyncfix.toml"));
}

#[test]
fn test_invalid_mode_value_is_rejected() {
    asyncfix()
        .args(["fix", "--mode", "delete", "--location", "a.cs:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_locations_text_in_processing_order() {
    let temp = create_temp_repo();

    asyncfix()
        .current_dir(temp.path())
        .args(["locations", "--log", "build.log"])
        .assert()
        .success()
        .stdout("src/Service.cs:10\nsrc/Service.cs:5\n");
}

#[test]
fn test_locations_json_and_code_filter() {
    let temp = create_temp_repo();

    let output = asyncfix()
        .current_dir(temp.path())
        .args(["locations", "--log", "build.log", "--code", "CS0168", "--format", "json"])
        .output()
        .expect("run");
    assert!(output.status.success());

    let files: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(
        files,
        serde_json::json!([{ "path": "src/Other.cs", "lines": [1] }])
    );
}

#[test]
fn test_locations_requires_a_log() {
    asyncfix()
        .arg("locations")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--log"));
}
