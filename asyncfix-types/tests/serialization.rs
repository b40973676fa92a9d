use asyncfix_types::location::FlaggedLocation;
use asyncfix_types::mode::{FixMode, NestedReturns};
use asyncfix_types::run::{AsyncfixRun, LocationStatus, RunSummary, ToolInfo};
use asyncfix_types::shape::{ReturnShape, Wrapper};
use pretty_assertions::assert_eq;

fn tool() -> ToolInfo {
    ToolInfo {
        name: "asyncfix".to_string(),
        version: Some("1.0.0".to_string()),
    }
}

#[test]
fn location_status_serializes_snake_case() {
    let fixed = serde_json::to_value(LocationStatus::Fixed).expect("serialize");
    let already = serde_json::to_value(LocationStatus::AlreadyFixed).expect("serialize");
    let skipped = serde_json::to_value(LocationStatus::Skipped).expect("serialize");
    let fatal = serde_json::to_value(LocationStatus::Fatal).expect("serialize");

    assert_eq!(fixed, serde_json::json!("fixed"));
    assert_eq!(already, serde_json::json!("already_fixed"));
    assert_eq!(skipped, serde_json::json!("skipped"));
    assert_eq!(fatal, serde_json::json!("fatal"));
}

#[test]
fn fix_mode_uses_short_names() {
    assert_eq!(
        serde_json::to_value(FixMode::RemoveAsyncAndWrap).expect("serialize"),
        serde_json::json!("rewrite")
    );
    let mode: FixMode = serde_json::from_str("\"suppress\"").expect("deserialize");
    assert_eq!(mode, FixMode::SuppressOnly);
    assert_eq!(mode.as_str(), "suppress");
}

#[test]
fn nested_returns_is_kebab_case() {
    let policy: NestedReturns = serde_json::from_str("\"top-level\"").expect("deserialize");
    assert_eq!(policy, NestedReturns::TopLevel);
    assert_eq!(
        serde_json::to_value(NestedReturns::All).expect("serialize"),
        serde_json::json!("all")
    );
}

#[test]
fn return_shape_is_tagged_by_kind() {
    let shape = ReturnShape::WrappedValue {
        wrapper: Wrapper::ValueTask,
        inner: "int".to_string(),
    };
    let value = serde_json::to_value(&shape).expect("serialize");
    assert_eq!(
        value,
        serde_json::json!({ "kind": "wrapped_value", "wrapper": "value_task", "inner": "int" })
    );
    assert_eq!(shape.label(), "wrapped_value");
    assert_eq!(shape.wrapper(), Some(Wrapper::ValueTask));
    assert_eq!(ReturnShape::Unknown.wrapper(), None);
}

#[test]
fn run_omits_empty_errors_and_carries_schema() {
    let run = AsyncfixRun::new(tool(), "run-1".to_string(), FixMode::default());
    let value = serde_json::to_value(&run).expect("serialize run");
    assert!(value.get("errors").is_none());
    assert_eq!(value["schema"], serde_json::json!("asyncfix.run.v1"));
    assert_eq!(value["mode"], serde_json::json!("rewrite"));
    assert_eq!(value["applied"], serde_json::json!(false));
}

#[test]
fn summary_record_counts_each_status() {
    let mut summary = RunSummary::default();
    summary.record(LocationStatus::Fixed);
    summary.record(LocationStatus::Fixed);
    summary.record(LocationStatus::AlreadyFixed);
    summary.record(LocationStatus::Skipped);
    summary.record(LocationStatus::Fatal);

    assert_eq!(
        summary,
        RunSummary {
            locations: 5,
            fixed: 2,
            already_fixed: 1,
            skipped: 1,
            fatal: 1,
            files_modified: 0,
        }
    );
}

#[test]
fn flagged_location_orders_by_path_then_line() {
    let mut locs = vec![
        FlaggedLocation::new("b.cs", 3),
        FlaggedLocation::new("a.cs", 20),
        FlaggedLocation::new("a.cs", 4),
    ];
    locs.sort();
    let rendered: Vec<String> = locs.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, vec!["a.cs:4", "a.cs:20", "b.cs:3"]);
}

#[test]
fn flagged_location_skips_absent_optionals() {
    let value = serde_json::to_value(FlaggedLocation::new("src/A.cs", 12)).expect("serialize");
    assert_eq!(value, serde_json::json!({ "path": "src/A.cs", "line": 12 }));
}
