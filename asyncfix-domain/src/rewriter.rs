//! Plan the edits that turn an `async` method without `await` into a synchronous one.
//!
//! Planning works against one immutable analysis of the buffer and only emits insertions and
//! deletions, so no offset computed here is ever read after the text has changed.

use std::ops::Range;

use asyncfix_types::mode::NestedReturns;
use asyncfix_types::shape::{ReturnShape, Wrapper};
use tracing::debug;

use crate::brackets::{BracketDepth, BracketTracker, Structural, is_ident_byte};
use crate::buffer::{SourceBuffer, TextEdit};
use crate::error::{FixError, MalformedInput};
use crate::lexer::Lexed;
use crate::locator::{MethodBody, MethodSpan};

const RETURN: &str = "return";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteOptions {
    pub nested_returns: NestedReturns,
    /// Spell out `Task.FromResult<T>(…)` on every wrap, not only where inference fails.
    pub explicit_type_arguments: bool,
    /// Append a completed-task return to `Task` bodies that can fall off the end.
    pub complete_fallthrough: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            nested_returns: NestedReturns::TopLevel,
            explicit_type_arguments: false,
            complete_fallthrough: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnStatement {
    /// Offset of the `return` keyword.
    pub keyword: usize,
    /// Offset of the terminating `;`.
    pub terminator: usize,
    /// Expression without surrounding blanks and comments; `None` for a bare `return;`.
    pub expression: Option<Range<usize>>,
    /// Inside a lambda, anonymous method, local function or initializer.
    pub nested: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyScan {
    pub returns: Vec<ReturnStatement>,
    /// Offsets of every `await` in method scope.
    pub awaits: Vec<usize>,
    /// Leading word of the last method-level statement, empty if it starts with punctuation.
    pub last_statement: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewritePlan {
    pub edits: Vec<TextEdit>,
    pub returns_rewritten: usize,
}

struct PendingReturn {
    keyword: usize,
    depth: BracketDepth,
    nested: bool,
    first: Option<usize>,
    last: usize,
}

fn continues_ident(b: u8) -> bool {
    b != b'@' && is_ident_byte(b)
}

/// Enumerate return statements, method-scope awaits and the last statement of a body.
pub fn scan_body(
    buffer: &SourceBuffer,
    lexed: &Lexed,
    interior: Range<usize>,
) -> Result<BodyScan, FixError> {
    let text = buffer.text();
    let bytes = text.as_bytes();
    let mut tracker = BracketTracker::starting_at_line(buffer.line_of(interior.start));
    let mut scan = BodyScan::default();
    let mut pending: Vec<PendingReturn> = Vec::new();
    let mut statement_start = true;

    for pos in interior {
        let b = bytes[pos];
        let state = lexed.state_at(pos);

        let word_starts = state.is_code()
            && is_ident_byte(b)
            && !(pos > 0 && lexed.is_code(pos - 1) && is_ident_byte(bytes[pos - 1]));
        let word = word_starts.then(|| {
            let len = 1 + bytes[pos + 1..]
                .iter()
                .take_while(|c| continues_ident(**c))
                .count();
            &text[pos..pos + len]
        });

        match word {
            Some(RETURN) if tracker.last_word() != Some("yield") => pending.push(PendingReturn {
                keyword: pos,
                depth: tracker.depth(),
                nested: tracker.in_nested_scope(),
                first: None,
                last: pos,
            }),
            Some("await") if !tracker.in_nested_scope() => scan.awaits.push(pos),
            _ => {}
        }

        let significant = state.is_literal() || (state.is_code() && !b.is_ascii_whitespace());
        if statement_start && significant && b != b';' && tracker.depth().is_zero() {
            scan.last_statement = Some(word.unwrap_or_default().to_string());
            statement_start = false;
        }

        let event = tracker.feed(b, state)?;

        let closes_return = event == Some(Structural::Semicolon)
            && pending.last().is_some_and(|p| p.depth == tracker.depth());
        if closes_return && let Some(top) = pending.pop() {
            scan.returns.push(ReturnStatement {
                keyword: top.keyword,
                terminator: pos,
                expression: top.first.map(|first| first..top.last + 1),
                nested: top.nested,
            });
        } else if significant {
            for open in pending.iter_mut().filter(|p| pos >= p.keyword + RETURN.len()) {
                open.first.get_or_insert(pos);
                open.last = pos;
            }
        }

        match event {
            Some(Structural::Semicolon | Structural::CloseBrace(_)) if tracker.depth().is_zero() => {
                statement_start = true;
            }
            _ => {}
        }
    }

    if let Some(open) = pending.first() {
        return Err(MalformedInput::UnterminatedStatement {
            line: buffer.line_of(open.keyword),
        }
        .into());
    }

    scan.returns.sort_by_key(|r| r.keyword);
    Ok(scan)
}

/// Plan the rewrite of one located method whose shape has been classified.
pub fn plan_rewrite(
    buffer: &SourceBuffer,
    lexed: &Lexed,
    span: &MethodSpan,
    async_keyword: Range<usize>,
    options: &RewriteOptions,
) -> Result<RewritePlan, FixError> {
    let line = span.start_line;
    let (wrapper, inner) = match &span.return_shape_hint {
        ReturnShape::Unknown => {
            return Err(FixError::ManualReview(format!(
                "could not read the declaration at line {line}"
            )));
        }
        ReturnShape::PlainValue => {
            return Err(FixError::ManualReview(format!(
                "method at line {line} does not return Task or ValueTask"
            )));
        }
        ReturnShape::WrappedValue { wrapper, inner } => (*wrapper, Some(inner.as_str())),
        ReturnShape::WrappedVoid { wrapper } => (*wrapper, None),
    };

    let interior = span.body.interior();
    let scan = scan_body(buffer, lexed, interior.clone())?;
    if let Some(&at) = scan.awaits.first() {
        return Err(FixError::ManualReview(format!(
            "method awaits at line {}; the diagnostic looks stale",
            buffer.line_of(at)
        )));
    }

    let text = buffer.text();
    let mut plan = RewritePlan::default();
    plan.edits.push(remove_async(text, async_keyword));

    match (span.body, inner) {
        (MethodBody::Expression { .. }, None) => {
            return Err(FixError::ManualReview(format!(
                "expression-bodied member at line {line} returns {} and has no value to wrap",
                wrapper.type_name()
            )));
        }
        (MethodBody::Expression { .. }, Some(inner)) => {
            let Some(expr) = trimmed(lexed, text, interior) else {
                return Err(FixError::ManualReview(format!(
                    "expression body at line {line} is empty"
                )));
            };
            if wrap_expression(text, expr, wrapper, inner, options, &mut plan.edits) {
                plan.returns_rewritten += 1;
            }
        }
        (MethodBody::Block { .. }, Some(inner)) => {
            for ret in selected(&scan, options) {
                let Some(expr) = ret.expression.clone() else {
                    return Err(FixError::SignatureMismatch(format!(
                        "bare `return;` at line {} in a method returning {}<{inner}>",
                        buffer.line_of(ret.keyword),
                        wrapper.type_name()
                    )));
                };
                if wrap_expression(text, expr, wrapper, inner, options, &mut plan.edits) {
                    plan.returns_rewritten += 1;
                }
            }
        }
        (MethodBody::Block { open, close }, None) => {
            for ret in selected(&scan, options) {
                if ret.expression.is_some() {
                    return Err(FixError::SignatureMismatch(format!(
                        "`return` with a value at line {} in a method returning {}",
                        buffer.line_of(ret.keyword),
                        wrapper.type_name()
                    )));
                }
                plan.edits.push(TextEdit::insert(
                    ret.keyword + RETURN.len(),
                    format!(" {}", wrapper.completed()),
                ));
                plan.returns_rewritten += 1;
            }
            let ends_in_jump = matches!(scan.last_statement.as_deref(), Some("return" | "throw"));
            if options.complete_fallthrough && !ends_in_jump {
                debug!(line, "appending completed-task return");
                plan.edits.push(fallthrough_return(buffer, open, close, wrapper));
            }
        }
    }

    Ok(plan)
}

fn selected<'a>(
    scan: &'a BodyScan,
    options: &'a RewriteOptions,
) -> impl Iterator<Item = &'a ReturnStatement> {
    scan.returns
        .iter()
        .filter(|r| options.nested_returns == NestedReturns::All || !r.nested)
}

/// Delete `async` and the blanks after it, or before it when it ends the line.
fn remove_async(text: &str, keyword: Range<usize>) -> TextEdit {
    let bytes = text.as_bytes();
    let is_blank = |b: &&u8| matches!(**b, b' ' | b'\t');
    let trailing = bytes[keyword.end..].iter().take_while(is_blank).count();
    if trailing > 0 {
        return TextEdit::delete(keyword.start..keyword.end + trailing);
    }
    let leading = bytes[..keyword.start].iter().rev().take_while(is_blank).count();
    TextEdit::delete(keyword.start - leading..keyword.end)
}

/// Range of `range` without leading and trailing blanks or comments.
fn trimmed(lexed: &Lexed, text: &str, range: Range<usize>) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    let significant = |i: &usize| {
        let state = lexed.state_at(*i);
        state.is_literal() || (state.is_code() && !bytes[*i].is_ascii_whitespace())
    };
    let first = range.clone().find(significant)?;
    let last = range.rev().find(significant)?;
    Some(first..last + 1)
}

/// Expressions a wrapper call already produces.
pub fn is_already_wrapped(expr: &str) -> bool {
    let expr = expr.trim_start();
    let expr = expr.strip_prefix("System.Threading.Tasks.").unwrap_or(expr);
    ["Task.FromResult", "ValueTask.FromResult", "new ValueTask"]
        .iter()
        .any(|prefix| expr.starts_with(prefix))
}

/// Expressions whose type comes from the target, so `Task.FromResult` cannot infer `T`.
fn needs_type_argument(expr: &str) -> bool {
    let expr = expr.trim();
    matches!(expr, "null" | "default")
        || expr.starts_with("new(")
        || expr.starts_with("new (")
        || expr.starts_with('[')
        || expr.starts_with("delegate")
        || expr.contains("=>")
}

fn wrap_expression(
    text: &str,
    expr: Range<usize>,
    wrapper: Wrapper,
    inner: &str,
    options: &RewriteOptions,
    edits: &mut Vec<TextEdit>,
) -> bool {
    let source = &text[expr.clone()];
    if is_already_wrapped(source) {
        return false;
    }
    let open = match wrapper {
        Wrapper::Task if options.explicit_type_arguments || needs_type_argument(source) => {
            format!("Task.FromResult<{inner}>(")
        }
        Wrapper::Task => "Task.FromResult(".to_string(),
        Wrapper::ValueTask => format!("new ValueTask<{inner}>("),
    };
    edits.push(TextEdit::insert(expr.start, open));
    edits.push(TextEdit::insert(expr.end, ")"));
    true
}

/// `return <completed>;` before the closing brace of a body that can fall through.
fn fallthrough_return(buffer: &SourceBuffer, open: usize, close: usize, wrapper: Wrapper) -> TextEdit {
    let text = buffer.text();
    let statement = format!("return {};", wrapper.completed());
    let open_line = buffer.line_of(open);
    let close_line = buffer.line_of(close);
    let line_start = buffer.line_start(close_line).unwrap_or(close);
    let brace_indent = &text[line_start..close];

    if close_line > open_line && brace_indent.trim().is_empty() {
        let unit = indent_unit(buffer, open_line, close_line, brace_indent);
        return TextEdit::insert(
            line_start,
            format!("{brace_indent}{unit}{statement}{}", buffer.line_ending()),
        );
    }

    let lead = match text[..close].chars().next_back() {
        Some(' ' | '\t') => "",
        _ => " ",
    };
    TextEdit::insert(close, format!("{lead}{statement} "))
}

/// One indentation step, taken from the body's own lines when possible.
fn indent_unit(buffer: &SourceBuffer, open_line: usize, close_line: usize, base: &str) -> String {
    for line in open_line + 1..close_line {
        let indent = buffer.indentation(line);
        let blank = buffer.line_text(line).is_none_or(|t| t.trim().is_empty());
        if !blank && indent.len() > base.len() && indent.starts_with(base) {
            return indent[base.len()..].to_string();
        }
    }
    if base.contains('\t') { "\t".into() } else { "    ".into() }
}
