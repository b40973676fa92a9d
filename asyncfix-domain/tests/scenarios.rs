//! End-to-end rewrites of whole C# files through `Engine::fix_source`.

use asyncfix_domain::{Engine, EngineOptions, FixError, LocationOutcome};
use asyncfix_types::mode::{FixMode, NestedReturns};
use asyncfix_types::shape::{ReturnShape, Wrapper};
use pretty_assertions::assert_eq;

fn fixed(text: &str, lines: &[usize]) -> String {
    Engine::default()
        .fix_source(text, lines)
        .text
        .expect("file should not abort")
}

const SERVICE: &str = r#"using System.Threading.Tasks;

namespace Demo
{
    public class Service
    {
        public async Task<int> Compute(bool x)
        {
            if (x)
            {
                return 1;
            }
            return 2;
        }

        public async Task Ping()
        {
            return;
        }

        public async Task<string> Describe()
        {
            // return "not a statement";
            var s = "braces { } and return; inside";
            return $"{s} {Compute(true).Result}";
        }
    }
}
"#;

const SERVICE_FIXED: &str = r#"using System.Threading.Tasks;

namespace Demo
{
    public class Service
    {
        public Task<int> Compute(bool x)
        {
            if (x)
            {
                return Task.FromResult(1);
            }
            return Task.FromResult(2);
        }

        public Task Ping()
        {
            return Task.CompletedTask;
        }

        public Task<string> Describe()
        {
            // return "not a statement";
            var s = "braces { } and return; inside";
            return Task.FromResult($"{s} {Compute(true).Result}");
        }
    }
}
"#;

#[test]
fn rewrites_every_flagged_method_in_a_file() {
    assert_eq!(fixed(SERVICE, &[7, 16, 21]), SERVICE_FIXED);
}

#[test]
fn flagged_line_order_does_not_matter() {
    assert_eq!(fixed(SERVICE, &[21, 7, 16]), SERVICE_FIXED);
    assert_eq!(fixed(SERVICE, &[7, 21, 16, 7]), SERVICE_FIXED);
}

#[test]
fn rewriting_is_idempotent() {
    let once = fixed(SERVICE, &[7, 16, 21]);
    let twice = Engine::default().fix_source(&once, &[7, 16, 21]);
    assert_eq!(twice.text.as_deref(), Some(once.as_str()));
    assert!(twice
        .results
        .iter()
        .all(|r| r.outcome == Ok(LocationOutcome::AlreadyFixed)));
}

#[test]
fn reports_shape_and_return_count() {
    let result = Engine::default().fix_source(SERVICE, &[7]);
    assert_eq!(
        result.results[0].outcome,
        Ok(LocationOutcome::Fixed {
            shape: ReturnShape::WrappedValue {
                wrapper: Wrapper::Task,
                inner: "int".into()
            },
            returns_rewritten: 2
        })
    );
}

#[test]
fn literal_contents_are_never_structural() {
    let text = r#"class C
{
    async Task<string> A()
    {
        var v = @"verbatim ""}"" return x;";
        var r = """
            raw } { return y;
            """;
        var c = '}';
        /* } return z; */
        return v + r + c;
    }
}
"#;
    let out = fixed(text, &[3]);
    assert!(out.contains("Task<string> A()"));
    assert!(out.contains("return Task.FromResult(v + r + c);"));
    assert!(out.contains(r#"@"verbatim ""}"" return x;""#));
    assert!(out.contains("raw } { return y;"));
    assert!(out.contains("/* } return z; */"));
}

#[test]
fn end_line_is_the_outer_brace() {
    let text = "class C\n{\n    async Task A()\n    {\n        if (a) { Log(); }\n    }\n\n    void B() { }\n}\n";
    let out = fixed(text, &[3]);
    assert_eq!(
        out,
        "class C\n{\n    Task A()\n    {\n        if (a) { Log(); }\n        return Task.CompletedTask;\n    }\n\n    void B() { }\n}\n"
    );
}

#[test]
fn local_functions_and_lambdas_keep_their_returns() {
    let text = r#"class C
{
    async Task<int> A()
    {
        int Twice(int v) { return v * 2; }
        Func<int, int> inc = v => { return v + 1; };
        var items = list.Select(i => i * 2);
        return Twice(inc(1));
    }
}
"#;
    let out = fixed(text, &[3]);
    assert!(out.contains("int Twice(int v) { return v * 2; }"));
    assert!(out.contains("v => { return v + 1; }"));
    assert!(out.contains("return Task.FromResult(Twice(inc(1)));"));
}

#[test]
fn nested_policy_all_rewrites_lambda_returns_too() {
    let engine = Engine::new(EngineOptions {
        nested_returns: NestedReturns::All,
        ..EngineOptions::default()
    });
    let text = "async Task<int> A() { Func<Task<int>> f = () => { return 1; }; return 2; }\n";
    let out = engine.fix_source(text, &[1]).text.expect("text");
    assert_eq!(
        out,
        "Task<int> A() { Func<Task<int>> f = () => { return Task.FromResult(1); }; return Task.FromResult(2); }\n"
    );
}

#[test]
fn stale_diagnostic_is_skipped_without_touching_the_file() {
    let text = "async Task A()\n{\n    await Task.Delay(1);\n}\n";
    let result = Engine::default().fix_source(text, &[1]);
    assert_eq!(result.text.as_deref(), Some(text));
    assert!(matches!(result.results[0].outcome, Err(FixError::ManualReview(_))));
}

#[test]
fn async_void_is_left_for_review() {
    let text = "async void Handler(object s, EventArgs e) { }\n";
    let result = Engine::default().fix_source(text, &[1]);
    assert_eq!(result.text.as_deref(), Some(text));
    assert!(matches!(result.results[0].outcome, Err(FixError::ManualReview(_))));
}

#[test]
fn runaway_scan_aborts_the_file() {
    let mut text = String::from("async Task A()\n{\n");
    for i in 0..40 {
        text.push_str(&format!("    Step({i});\n"));
    }
    text.push_str("}\nasync Task B() { }\n");
    let engine = Engine::new(EngineOptions {
        max_scan_lines: 10,
        ..EngineOptions::default()
    });
    let result = engine.fix_source(&text, &[1, 44]);
    assert!(result.is_aborted());
    assert!(result.results.iter().all(|r| r
        .outcome
        .as_ref()
        .is_err_and(FixError::is_file_fatal)));
}

#[test]
fn suppress_mode_fences_each_method() {
    let engine = Engine::new(EngineOptions {
        mode: FixMode::SuppressOnly,
        ..EngineOptions::default()
    });
    let text = "class C\n{\n    async Task A() { }\n    async Task B() { }\n}\n";
    let out = engine.fix_source(text, &[3, 4]).text.expect("text");
    let disable = "#pragma warning disable CS1998 // Async method lacks 'await' operators and will run synchronously";
    assert_eq!(
        out,
        format!(
            "class C\n{{\n    {disable}\n    async Task A() {{ }}\n    #pragma warning restore CS1998\n    {disable}\n    async Task B() {{ }}\n    #pragma warning restore CS1998\n}}\n"
        )
    );
}

#[test]
fn preprocessor_directives_are_ignored() {
    let text = "#if DEBUG\nasync Task<int> A()\n#else\n#endif\n{\n    return 1;\n}\n";
    let out = fixed(text, &[2]);
    assert_eq!(
        out,
        "#if DEBUG\nTask<int> A()\n#else\n#endif\n{\n    return Task.FromResult(1);\n}\n"
    );
}
