#![no_main]

//! Fuzz target for the per-file engine.
//!
//! Wraps arbitrary text in a flagged method so most inputs reach the rewriter rather than
//! failing in the locator.

use asyncfix_domain::lexer::lex;
use asyncfix_domain::{Engine, EngineOptions};
use asyncfix_types::mode::{FixMode, NestedReturns};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, arbitrary::Arbitrary)]
struct FixInput {
    body: String,
    return_type: ReturnTypeChoice,
    extra_lines: Vec<u8>,
    suppress: bool,
    nested_all: bool,
    explicit_type_arguments: bool,
}

#[derive(Debug, arbitrary::Arbitrary)]
enum ReturnTypeChoice {
    Task,
    TaskOfInt,
    ValueTaskOfString,
    Void,
    Int,
}

impl ReturnTypeChoice {
    fn as_str(&self) -> &'static str {
        match self {
            ReturnTypeChoice::Task => "Task",
            ReturnTypeChoice::TaskOfInt => "Task<int>",
            ReturnTypeChoice::ValueTaskOfString => "ValueTask<string>",
            ReturnTypeChoice::Void => "void",
            ReturnTypeChoice::Int => "int",
        }
    }
}

fuzz_target!(|input: FixInput| {
    let text = format!(
        "class C\n{{\n    async {} M()\n    {{\n{}\n    }}\n}}\n",
        input.return_type.as_str(),
        input.body
    );

    let engine = Engine::new(EngineOptions {
        mode: if input.suppress {
            FixMode::SuppressOnly
        } else {
            FixMode::RemoveAsyncAndWrap
        },
        nested_returns: if input.nested_all {
            NestedReturns::All
        } else {
            NestedReturns::TopLevel
        },
        explicit_type_arguments: input.explicit_type_arguments,
        ..EngineOptions::default()
    });

    let mut lines = vec![3];
    lines.extend(input.extra_lines.iter().map(|&l| usize::from(l)));
    let fix = engine.fix_source(&text, &lines);

    match &fix.text {
        // Edits never break the lexical structure of a file that lexed cleanly.
        Some(out) => assert!(lex(out).is_ok()),
        None => assert!(fix.results.iter().all(|r| r.outcome.is_err())),
    }
});
