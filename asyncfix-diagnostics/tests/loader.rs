//! Integration tests for build-log loading.

use asyncfix_diagnostics::{DEFAULT_CODE, collect_locations, load_diagnostics};
use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;

fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("tempdir")
}

fn logs_path(temp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().join("logs")).unwrap()
}

fn write_log(dir: &Utf8PathBuf, name: &str, contents: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), contents).unwrap();
}

fn pattern(dir: &Utf8PathBuf, glob: &str) -> Vec<String> {
    vec![dir.join(glob).to_string()]
}

const BUILD_LOG: &str = "\
  1>src/A.cs(10,22): warning CS1998: This async method lacks 'await' operators.
  1>src/A.cs(30,22): warning CS1998: This async method lacks 'await' operators.
  1>src/B.cs(5,9): warning CS0219: The variable 'x' is assigned but its value is never used
";

#[test]
fn test_missing_logs_dir() {
    let temp = create_temp_dir();
    let logs = logs_path(&temp);

    let loaded = load_diagnostics(&pattern(&logs, "*.log"), DEFAULT_CODE).unwrap();
    assert!(loaded.is_empty());
}

#[test]
fn test_single_log() {
    let temp = create_temp_dir();
    let logs = logs_path(&temp);
    write_log(&logs, "build.log", BUILD_LOG);

    let loaded = load_diagnostics(&pattern(&logs, "*.log"), DEFAULT_CODE).unwrap();
    assert_eq!(loaded.len(), 1);
    let locations = loaded[0].locations.as_ref().unwrap();
    assert_eq!(locations.len(), 2);
    assert_eq!(locations[1].line, 30);
}

#[test]
fn test_logs_sorted_and_read_once() {
    let temp = create_temp_dir();
    let logs = logs_path(&temp);
    write_log(&logs, "zeta.log", BUILD_LOG);
    write_log(&logs, "alpha.log", BUILD_LOG);

    let mut patterns = pattern(&logs, "*.log");
    patterns.extend(pattern(&logs, "alpha.*"));
    let loaded = load_diagnostics(&patterns, DEFAULT_CODE).unwrap();

    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].path.file_name(), Some("alpha.log"));
    assert_eq!(loaded[1].path.file_name(), Some("zeta.log"));
}

#[test]
fn test_collect_deduplicates_across_logs() {
    let temp = create_temp_dir();
    let logs = logs_path(&temp);
    write_log(&logs, "a.log", BUILD_LOG);
    write_log(&logs, "b.log", BUILD_LOG);

    let loaded = load_diagnostics(&pattern(&logs, "*.log"), DEFAULT_CODE).unwrap();
    let locations = collect_locations(&loaded);
    assert_eq!(
        locations.iter().map(|l| l.to_string()).collect::<Vec<_>>(),
        vec!["src/A.cs:10", "src/A.cs:30"]
    );
}

#[test]
fn test_non_utf8_log_is_still_parsed() {
    let temp = create_temp_dir();
    let logs = logs_path(&temp);
    fs::create_dir_all(&logs).unwrap();
    let mut bytes = b"\xff\xfe garbage\n".to_vec();
    bytes.extend_from_slice(BUILD_LOG.as_bytes());
    fs::write(logs.join("build.log"), bytes).unwrap();

    let loaded = load_diagnostics(&pattern(&logs, "*.log"), DEFAULT_CODE).unwrap();
    assert_eq!(loaded[0].locations.as_ref().unwrap().len(), 2);
}

#[test]
fn test_unreadable_entry_is_reported_not_fatal() {
    let temp = create_temp_dir();
    let logs = logs_path(&temp);
    // A directory matching the pattern cannot be read as a file.
    fs::create_dir_all(logs.join("nested.log")).unwrap();
    write_log(&logs, "build.log", BUILD_LOG);

    let loaded = load_diagnostics(&pattern(&logs, "*.log"), DEFAULT_CODE).unwrap();
    assert_eq!(loaded.len(), 2);
    assert!(loaded[0].locations.is_ok());
    assert!(loaded[1].locations.is_err());
    assert_eq!(collect_locations(&loaded).len(), 2);
}

#[test]
fn test_invalid_pattern_is_an_error() {
    let result = load_diagnostics(&["logs/[".to_string()], DEFAULT_CODE);
    assert!(result.is_err());
}
